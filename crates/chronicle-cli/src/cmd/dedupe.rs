//! `chron dedupe`: canonicalize countries, merge duplicates, validate.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context as _;
use chronicle_core::error::ErrorCode;
use chronicle_core::lock::{CatalogLock, lock_path_for};
use chronicle_core::store::{PersistOptions, PersistOutcome, persist_catalog};
use chronicle_core::timing::timed;
use chronicle_dedup::PipelineReport;
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::check::{write_findings, write_validation_pretty};
use super::{Context, fail};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DedupeArgs {
    /// Write the catalog back (atomic replace).
    #[arg(long, conflicts_with = "dry_run")]
    pub apply: bool,

    /// Report only; this is the default.
    #[arg(long)]
    pub dry_run: bool,

    /// Only process these countries (any accepted spelling, comma separated).
    #[arg(long, value_delimiter = ',')]
    pub countries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Written {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
    pub bytes: usize,
}

impl From<PersistOutcome> for Written {
    fn from(outcome: PersistOutcome) -> Self {
        Self {
            path: outcome.path.display().to_string(),
            backup: outcome.backup.map(|p| p.display().to_string()),
            bytes: outcome.bytes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DedupeOutput {
    pub catalog: String,
    pub applied: bool,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<Written>,
    pub report: PipelineReport,
}

pub fn run_dedupe(args: &DedupeArgs, ctx: &Context) -> anyhow::Result<()> {
    let loaded = ctx.load()?;
    let pipeline = loaded.pipeline(ctx)?;
    let filter = loaded.filter(&args.countries);

    let lock = if args.apply {
        let timeout = Duration::from_millis(loaded.config.persist.lock_timeout_ms);
        let lock = CatalogLock::acquire(&lock_path_for(&ctx.catalog), timeout)
            .map_err(|err| fail(ctx.output, err.code(), err.to_string()))?;
        Some(lock)
    } else {
        None
    };

    let mut catalog = ctx.load_catalog()?;
    let before = catalog.clone();
    let report = pipeline.run(&mut catalog, filter.as_ref());
    let changed = catalog != before;

    let written = if args.apply && changed {
        let opts = PersistOptions {
            backup: loaded.config.persist.backup,
        };
        let outcome = timed("persist", || persist_catalog(&ctx.catalog, &catalog, opts))
            .map_err(|err| fail(ctx.output, err.code(), err.to_string()))?;
        info!(
            path = %outcome.path.display(),
            bytes = outcome.bytes,
            "catalog written"
        );
        Some(Written::from(outcome))
    } else {
        None
    };

    if let Some(lock) = lock {
        lock.release();
    }

    let output = DedupeOutput {
        catalog: ctx.catalog.display().to_string(),
        applied: args.apply,
        changed,
        written,
        report,
    };
    render_mode(ctx.output, &output, render_text, render_pretty)
        .context("failed to render dedupe report")?;

    let violations = output.report.validation.violations.len();
    if violations > 0 {
        return Err(fail(
            ctx.output,
            ErrorCode::ValidationFailed,
            format!("{violations} consistency violation(s) remain after dedupe"),
        ));
    }
    Ok(())
}

fn render_text(out: &DedupeOutput, w: &mut dyn Write) -> io::Result<()> {
    let r = &out.report;
    writeln!(
        w,
        "events_before={} events_after={} removed={} groups={} violations={}",
        r.events_before,
        r.events_after,
        r.removed(),
        r.merges.len(),
        r.validation.violations.len()
    )?;
    for m in &r.merges {
        writeln!(
            w,
            "merge {}\t{}\t{}\t{}",
            m.country,
            m.year,
            m.survivor,
            m.absorbed.join(",")
        )?;
    }
    for (spelling, count) in &r.canonicalization.unknown {
        writeln!(w, "unknown_country {spelling}\t{count}")?;
    }
    write_findings(w, &r.validation)?;
    match &out.written {
        Some(written) => writeln!(w, "written {}", written.path),
        None if out.applied => writeln!(w, "unchanged"),
        None => writeln!(w, "dry_run"),
    }
}

fn render_pretty(out: &DedupeOutput, w: &mut dyn Write) -> io::Result<()> {
    let r = &out.report;
    let mode = if out.applied { "apply" } else { "dry run" };
    pretty_section(w, &format!("Dedupe ({mode}) {}", out.catalog))?;
    pretty_kv(w, "events", format!("{} → {}", r.events_before, r.events_after))?;
    pretty_kv(w, "removed", r.removed().to_string())?;
    pretty_kv(w, "groups", r.merges.len().to_string())?;
    pretty_kv(
        w,
        "compared",
        format!("{} pairs in {} buckets", r.comparisons, r.buckets),
    )?;
    if r.malformed > 0 {
        pretty_kv(w, "malformed", format!("{} (kept as is)", r.malformed))?;
    }
    writeln!(w)?;

    let c = &r.canonicalization;
    pretty_section(w, "Countries")?;
    pretty_kv(w, "examined", c.examined.to_string())?;
    pretty_kv(w, "names changed", c.names_changed.to_string())?;
    pretty_kv(w, "codes filled", c.codes_filled.to_string())?;
    pretty_kv(w, "codes changed", c.codes_changed.to_string())?;
    pretty_kv(w, "codes recased", c.codes_case_normalized.to_string())?;
    for (spelling, count) in &c.unknown {
        writeln!(w, "  ? {spelling} ({count})")?;
    }
    writeln!(w)?;

    if !r.merges.is_empty() {
        pretty_section(w, "Merges")?;
        for m in &r.merges {
            writeln!(
                w,
                "  {} {}  {} ← {}",
                m.country,
                m.year,
                m.survivor,
                m.absorbed.join(", ")
            )?;
            for link in &m.links {
                writeln!(w, "      {} ~ {}  [{}]", link.a, link.b, link.rule)?;
            }
            if !m.fields.is_empty() {
                writeln!(w, "      filled: {}", m.fields.join(", "))?;
            }
        }
        writeln!(w)?;

        pretty_section(w, "Per country")?;
        for (country, summary) in &r.countries {
            pretty_kv(
                w,
                country,
                format!("{} group(s), {} removed", summary.groups, summary.removed),
            )?;
        }
        writeln!(w)?;
    }

    write_validation_pretty(w, &r.validation)?;
    writeln!(w)?;

    match &out.written {
        Some(written) => {
            writeln!(w, "Wrote {} ({} bytes)", written.path, written.bytes)?;
            if let Some(backup) = &written.backup {
                writeln!(w, "Backup {backup}")?;
            }
        }
        None if out.applied => writeln!(w, "Nothing changed; catalog left as is.")?,
        None => writeln!(w, "Dry run; pass --apply to write.")?,
    }
    Ok(())
}
