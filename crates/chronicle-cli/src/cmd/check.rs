//! `chron check`: validate the catalog without changing it.

use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::Context as _;
use chronicle_core::error::ErrorCode;
use chronicle_core::validate::ValidationReport;
use clap::Args;
use serde::Serialize;

use super::{Context, fail};
use crate::output::{pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Only check these countries (any accepted spelling, comma separated).
    #[arg(long, value_delimiter = ',')]
    pub countries: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckOutput {
    pub catalog: String,
    pub events: usize,
    pub countries: usize,
    pub malformed: usize,
    pub validation: ValidationReport,
}

pub fn run_check(args: &CheckArgs, ctx: &Context) -> anyhow::Result<()> {
    let loaded = ctx.load()?;
    let pipeline = loaded.pipeline(ctx)?;
    let filter = loaded.filter(&args.countries);
    let catalog = ctx.load_catalog()?;

    let in_scope: Vec<_> = catalog
        .events()
        .filter(|(_, e)| pipeline.in_scope(e, filter.as_ref()))
        .map(|(_, e)| e)
        .collect();
    let countries: BTreeSet<&str> = in_scope.iter().map(|e| e.country_name.as_str()).collect();

    let output = CheckOutput {
        catalog: ctx.catalog.display().to_string(),
        events: in_scope.len(),
        countries: countries.len(),
        malformed: catalog.malformed().count(),
        validation: pipeline.check(&catalog, filter.as_ref()),
    };

    render_mode(ctx.output, &output, render_text, render_pretty)
        .context("failed to render check report")?;

    let violations = output.validation.violations.len();
    if violations > 0 {
        return Err(fail(
            ctx.output,
            ErrorCode::ValidationFailed,
            format!("{violations} consistency violation(s) in {}", output.catalog),
        ));
    }
    Ok(())
}

fn render_text(out: &CheckOutput, w: &mut dyn Write) -> io::Result<()> {
    writeln!(
        w,
        "events={} countries={} malformed={} violations={} notices={}",
        out.events,
        out.countries,
        out.malformed,
        out.validation.violations.len(),
        out.validation.notices.len()
    )?;
    write_findings(w, &out.validation)
}

fn render_pretty(out: &CheckOutput, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Catalog {}", out.catalog))?;
    pretty_kv(w, "events", out.events.to_string())?;
    pretty_kv(w, "countries", out.countries.to_string())?;
    pretty_kv(w, "malformed", out.malformed.to_string())?;
    writeln!(w)?;
    write_validation_pretty(w, &out.validation)
}

/// One line per violation, then one per notice.
pub fn write_findings(w: &mut dyn Write, report: &ValidationReport) -> io::Result<()> {
    for v in &report.violations {
        writeln!(w, "violation {v}")?;
    }
    for v in &report.notices {
        writeln!(w, "notice {v}")?;
    }
    Ok(())
}

pub fn write_validation_pretty(w: &mut dyn Write, report: &ValidationReport) -> io::Result<()> {
    pretty_section(w, "Validation")?;
    pretty_kv(w, "checked", report.checked.to_string())?;
    if report.is_clean() {
        pretty_kv(w, "violations", "none")?;
    } else {
        for (kind, count) in report.counts() {
            pretty_kv(w, kind.as_str(), count.to_string())?;
        }
        writeln!(w)?;
        for v in &report.violations {
            writeln!(w, "  ✗ {v}")?;
        }
    }
    if !report.notices.is_empty() {
        writeln!(w)?;
        for v in &report.notices {
            writeln!(w, "  · {v}")?;
        }
    }
    Ok(())
}
