//! Command handlers and the inputs they share.

pub mod check;
pub mod dedupe;
pub mod review;

use std::path::PathBuf;

use chronicle_core::canonicalize::CountryFilter;
use chronicle_core::config::{ChronicleConfig, load_config};
use chronicle_core::error::ErrorCode;
use chronicle_core::identity::CountryIdentityTable;
use chronicle_core::model::Catalog;
use chronicle_core::store::load_catalog;
use chronicle_dedup::Pipeline;
use tracing::debug;

use crate::output::{CliError, OutputMode, render_error};

/// File locations resolved from the global flags.
#[derive(Debug, Clone)]
pub struct Context {
    pub catalog: PathBuf,
    pub countries_table: PathBuf,
    pub config: Option<PathBuf>,
    pub output: OutputMode,
}

/// Everything a command needs before it touches the catalog.
pub struct Loaded {
    pub config: ChronicleConfig,
    pub table: CountryIdentityTable,
}

impl Loaded {
    pub fn pipeline(&self, ctx: &Context) -> anyhow::Result<Pipeline<'_>> {
        Pipeline::new(&self.table, &self.config)
            .map_err(|err| fail(ctx.output, err.code(), err.to_string()))
    }

    /// Filter from `--countries`, `None` when no country was named.
    pub fn filter(&self, countries: &[String]) -> Option<CountryFilter> {
        let filter = CountryFilter::new(countries, &self.table);
        (!filter.is_empty()).then_some(filter)
    }
}

impl Context {
    pub fn load(&self) -> anyhow::Result<Loaded> {
        let config = load_config(self.config.as_deref(), &self.catalog)
            .map_err(|err| fail(self.output, err.code(), err.to_string()))?;
        let table = CountryIdentityTable::load(&self.countries_table)
            .map_err(|err| fail(self.output, err.code(), err.to_string()))?;
        debug!(
            countries = table.len(),
            collisions = table.collisions().len(),
            "loaded country identity table"
        );
        Ok(Loaded { config, table })
    }

    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        load_catalog(&self.catalog).map_err(|err| fail(self.output, err.code(), err.to_string()))
    }
}

/// Report a coded failure on stderr and turn it into an error for `main`.
pub fn fail(output: OutputMode, code: ErrorCode, message: String) -> anyhow::Error {
    if let Err(err) = render_error(output, &CliError::from_code(code, message)) {
        return err.context("failed to render error");
    }
    anyhow::anyhow!("{code}: {}", code.message())
}
