//! `chron review`: list pairs that almost merged.

use std::io::{self, Write};

use anyhow::Context as _;
use chronicle_core::timing::timed;
use chronicle_dedup::review::{NearMiss, ReviewFloors, near_misses};
use chronicle_dedup::rules::RuleKind;
use clap::Args;
use serde::Serialize;
use tracing::debug;

use super::Context;
use crate::output::{Renderable, render_list};

#[derive(Args, Debug)]
pub struct ReviewArgs {
    /// Only review these countries (any accepted spelling, comma separated).
    #[arg(long, value_delimiter = ',')]
    pub countries: Vec<String>,

    /// Show at most this many pairs.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Minimum character similarity to list a pair (overrides config).
    #[arg(long)]
    pub char_floor: Option<f64>,

    /// Minimum token similarity to list a pair (overrides config).
    #[arg(long)]
    pub token_floor: Option<f64>,
}

/// One listed pair.
#[derive(Debug, Serialize)]
pub struct ReviewRow(NearMiss);

impl Renderable for ReviewRow {
    fn render_human(&self, w: &mut dyn Write) -> io::Result<()> {
        let m = &self.0;
        writeln!(w, "{} {}", m.bucket.country, m.bucket.year)?;
        writeln!(w, "  {:<12} {} [{}]", m.a.id, m.a.title, m.a.category)?;
        writeln!(w, "  {:<12} {} [{}]", m.b.id, m.b.title, m.b.category)?;
        let rejected = m.rejected_by.map_or("no rule", RuleKind::as_str);
        writeln!(
            w,
            "  chars {:.2}  tokens {:.2}  rejected by {rejected}",
            m.char_ratio, m.token_ratio
        )?;
        writeln!(w)
    }

    fn render_table(&self, w: &mut dyn Write) -> io::Result<()> {
        let m = &self.0;
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{:.3}\t{:.3}\t{}",
            m.bucket.country,
            m.bucket.year,
            m.a.id,
            m.b.id,
            m.char_ratio,
            m.token_ratio,
            m.rejected_by.map_or("-", RuleKind::as_str)
        )
    }

    fn table_headers() -> &'static [&'static str] {
        &["country", "year", "a", "b", "chars", "tokens", "rejected_by"]
    }
}

pub fn run_review(args: &ReviewArgs, ctx: &Context) -> anyhow::Result<()> {
    let loaded = ctx.load()?;
    let pipeline = loaded.pipeline(ctx)?;
    let filter = loaded.filter(&args.countries);

    let mut floors = ReviewFloors::from(&loaded.config.review);
    if let Some(v) = args.char_floor {
        floors.char_ratio = v;
    }
    if let Some(v) = args.token_floor {
        floors.token_ratio = v;
    }

    let mut catalog = ctx.load_catalog()?;
    let report = pipeline.run(&mut catalog, filter.as_ref());
    debug!(
        groups = report.merges.len(),
        removed = report.removed(),
        "merged in memory before review"
    );

    let mut rows: Vec<ReviewRow> = timed("review", || {
        near_misses(
            &catalog,
            pipeline.cascade(),
            pipeline.normalizer(),
            floors,
            |r| pipeline.in_scope(r, filter.as_ref()),
        )
    })
    .into_iter()
    .map(ReviewRow)
    .collect();

    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }
    render_list(&rows, ctx.output).context("failed to render review list")
}
