#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::env;
use std::path::PathBuf;

use chronicle_core::timing;
use clap::{Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "chron",
    author,
    version,
    about = "chron: historical event catalog canonicalization and dedup",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit command timing report to stderr.
    #[arg(long, global = true)]
    timing: bool,

    /// Output format (pretty, text, json). Defaults to pretty on a TTY.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Event catalog to read (and write with `dedupe --apply`).
    #[arg(long, global = true, default_value = "data/events.json")]
    catalog: PathBuf,

    /// Country identity table.
    #[arg(long, global = true, default_value = "data/country_mappings.json")]
    countries_table: PathBuf,

    /// Config file; defaults to `chronicle.toml` next to the catalog.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn context(&self) -> cmd::Context {
        cmd::Context {
            catalog: self.catalog.clone(),
            countries_table: self.countries_table.clone(),
            config: self.config.clone(),
            output: resolve_output_mode(self.format, self.json),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Canonicalize countries and merge duplicate events",
        long_about = "Rewrite every country to its canonical spelling, group records that \
                      describe the same event within a country and year, fold each group \
                      into its richest record, and validate the result.\n\n\
                      Without --apply nothing is written.",
        after_help = "EXAMPLES:\n    # Preview what would change\n    chron dedupe\n\n    # Write the result (a timestamped backup is kept)\n    chron dedupe --apply\n\n    # Only touch two countries\n    chron dedupe --apply --countries Türkiye,Fransa"
    )]
    Dedupe(cmd::dedupe::DedupeArgs),

    #[command(
        about = "Validate the catalog (CI gate)",
        long_about = "Check every record against the catalog invariants: canonical country \
                      names, matching country codes, unique titles per country and year, \
                      known categories, and decades derived from years. Nothing is written.",
        after_help = "EXAMPLES:\n    # Check the default catalog\n    chron check\n\n    # Check two countries only\n    chron check --countries Türkiye,Fransa\n\n    # Machine-readable output\n    chron check --json"
    )]
    Check(cmd::check::CheckArgs),

    #[command(
        about = "List near-duplicate pairs for a human to judge",
        long_about = "Run the pipeline in memory, then list every pair in the same country \
                      and year that was not merged but whose titles are still close. \
                      Nothing is written.",
        after_help = "EXAMPLES:\n    # Everything above the configured floors\n    chron review\n\n    # Stricter character floor, first 20 pairs\n    chron review --char-floor 0.85 --limit 20"
    )]
    Review(cmd::review::ReviewArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("CHRONICLE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "chronicle=debug,info"
        } else {
            "chronicle=info,warn"
        })
    });

    let format = env::var("CHRONICLE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let timing_enabled = cli.timing || timing::timing_enabled_from_env();
    timing::set_timing_enabled(timing_enabled);
    timing::clear_timings();

    let ctx = cli.context();
    debug!(catalog = %ctx.catalog.display(), output = ?ctx.output, "starting");

    let command_result = match cli.command {
        Commands::Dedupe(ref args) => {
            timing::timed("cmd.dedupe", || cmd::dedupe::run_dedupe(args, &ctx))
        }
        Commands::Check(ref args) => {
            timing::timed("cmd.check", || cmd::check::run_check(args, &ctx))
        }
        Commands::Review(ref args) => {
            timing::timed("cmd.review", || cmd::review::run_review(args, &ctx))
        }
    };

    if timing_enabled {
        let report = timing::collect_report();
        if report.is_empty() {
            eprintln!("timing report: no samples recorded");
        } else {
            eprintln!("timing report:");
            eprintln!("{}", report.display_table());
            eprintln!("timing report (json):");
            eprintln!("{}", serde_json::to_string_pretty(&report.to_json())?);
        }
    }

    command_result
}
