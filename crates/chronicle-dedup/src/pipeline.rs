//! End-to-end run over an in-memory catalog.
//!
//! Canonicalize → pre-merge validation → group → resolve → final validation.
//! Nothing here touches the filesystem; the caller loads the catalog and
//! decides whether to persist the result.

use std::collections::{BTreeMap, HashSet};

use chronicle_core::canonicalize::{
    CanonicalizationReport, CountryFilter, LookupCache, canonicalize_catalog,
};
use chronicle_core::config::ChronicleConfig;
use chronicle_core::identity::CountryIdentityTable;
use chronicle_core::model::{Catalog, CatalogEntry, EventRecord};
use chronicle_core::normalize::TokenNormalizer;
use chronicle_core::timing::timed;
use chronicle_core::validate::{ValidationOptions, ValidationReport, validate};
use serde::Serialize;
use tracing::{info, warn};

use crate::grouping::{Grouping, Link, group};
use crate::merge::resolve;
use crate::rules::{Cascade, RuleError};

/// One resolved equivalence class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeRecord {
    pub country: String,
    pub year: i64,
    pub survivor: String,
    pub absorbed: Vec<String>,
    /// Survivor fields that changed.
    pub fields: Vec<String>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountrySummary {
    pub groups: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub events_before: usize,
    pub events_after: usize,
    pub malformed: usize,
    pub canonicalization: CanonicalizationReport,
    /// Validation right after canonicalization, before any merge.
    pub preflight: ValidationReport,
    pub buckets: usize,
    pub comparisons: usize,
    pub merges: Vec<MergeRecord>,
    pub countries: BTreeMap<String, CountrySummary>,
    pub validation: ValidationReport,
}

impl PipelineReport {
    #[must_use]
    pub fn removed(&self) -> usize {
        self.events_before - self.events_after
    }

    /// True when the final validation found no violation.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.validation.is_clean()
    }
}

/// Configured engine. Holds no per-run state, so one pipeline can process
/// any number of catalogs.
#[derive(Debug, Clone)]
pub struct Pipeline<'t> {
    table: &'t CountryIdentityTable,
    cascade: Cascade,
    normalizer: TokenNormalizer,
    validation: ValidationOptions,
}

impl<'t> Pipeline<'t> {
    /// # Errors
    ///
    /// Returns [`RuleError`] when the configured rule list names an unknown
    /// rule.
    pub fn new(
        table: &'t CountryIdentityTable,
        config: &ChronicleConfig,
    ) -> Result<Self, RuleError> {
        Ok(Self {
            table,
            cascade: Cascade::from_config(&config.matching)?,
            normalizer: config.matching.token_normalizer(),
            validation: config.validation.options(),
        })
    }

    #[must_use]
    pub const fn table(&self) -> &CountryIdentityTable {
        self.table
    }

    #[must_use]
    pub const fn cascade(&self) -> &Cascade {
        &self.cascade
    }

    #[must_use]
    pub const fn normalizer(&self) -> &TokenNormalizer {
        &self.normalizer
    }

    /// Whether `record` falls inside `filter`.
    #[must_use]
    pub fn in_scope(&self, record: &EventRecord, filter: Option<&CountryFilter>) -> bool {
        filter.is_none_or(|f| f.matches(&record.country_name, self.table))
    }

    /// Validate without changing anything.
    #[must_use]
    pub fn check(&self, catalog: &Catalog, filter: Option<&CountryFilter>) -> ValidationReport {
        timed("validate", || {
            validate(catalog, self.table, self.validation, filter)
        })
    }

    /// Run every stage on `catalog` in place.
    pub fn run(&self, catalog: &mut Catalog, filter: Option<&CountryFilter>) -> PipelineReport {
        let events_before = catalog.event_count();
        let malformed = catalog.malformed().count();
        if malformed > 0 {
            warn!(malformed, "malformed entries are passed through untouched");
        }

        let mut cache = LookupCache::new();
        let canonicalization = timed("canonicalize", || {
            canonicalize_catalog(catalog, self.table, filter, &mut cache)
        });

        let preflight = timed("validate.preflight", || {
            validate(catalog, self.table, self.validation, filter)
        });

        let grouping = timed("group", || {
            group(catalog, &self.cascade, &self.normalizer, |r| {
                self.in_scope(r, filter)
            })
        });

        let merges = timed("merge", || apply_merges(catalog, &grouping));

        let validation = timed("validate.final", || {
            validate(catalog, self.table, self.validation, filter)
        });

        let mut countries: BTreeMap<String, CountrySummary> = BTreeMap::new();
        for merge in &merges {
            let summary = countries.entry(merge.country.clone()).or_default();
            summary.groups += 1;
            summary.removed += merge.absorbed.len();
        }

        let report = PipelineReport {
            events_before,
            events_after: catalog.event_count(),
            malformed,
            canonicalization,
            preflight,
            buckets: grouping.buckets,
            comparisons: grouping.comparisons,
            merges,
            countries,
            validation,
        };

        info!(
            events_before = report.events_before,
            events_after = report.events_after,
            groups = report.merges.len(),
            violations = report.validation.violations.len(),
            "pipeline finished"
        );

        report
    }
}

/// Resolve every class, write survivors back in place, and drop the losers.
fn apply_merges(catalog: &mut Catalog, grouping: &Grouping) -> Vec<MergeRecord> {
    let mut writes: Vec<(usize, EventRecord)> = Vec::new();
    let mut removed: HashSet<usize> = HashSet::new();
    let mut merges = Vec::with_capacity(grouping.classes.len());

    for class in &grouping.classes {
        let members: Vec<(usize, &EventRecord)> = class
            .members
            .iter()
            .filter_map(|&i| catalog.entries.get(i)?.as_event().map(|e| (i, e)))
            .collect();
        let records: Vec<&EventRecord> = members.iter().map(|(_, e)| *e).collect();
        let Some(resolution) = resolve(&records) else {
            continue;
        };

        let survivor_index = members[resolution.survivor_pos].0;
        removed.extend(
            members
                .iter()
                .map(|(i, _)| *i)
                .filter(|i| *i != survivor_index),
        );

        merges.push(MergeRecord {
            country: class.bucket.country.clone(),
            year: class.bucket.year,
            survivor: resolution.survivor.id.clone(),
            absorbed: resolution.absorbed,
            fields: resolution.fields.into_iter().collect(),
            links: class.links.clone(),
        });
        writes.push((survivor_index, resolution.survivor));
    }

    for (index, survivor) in writes {
        if let Some(slot) = catalog.entries.get_mut(index) {
            *slot = CatalogEntry::Event(survivor);
        }
    }

    let mut index = 0;
    catalog.entries.retain(|_| {
        let keep = !removed.contains(&index);
        index += 1;
        keep
    });

    info!(
        groups = merges.len(),
        removed = removed.len(),
        "merged duplicate classes"
    );

    merges
}
