//! Country canonicalization: rewrite each record's country name and code to
//! the identity table's canonical values.
//!
//! Unknown spellings are never guessed at. They are left untouched and
//! counted in [`CanonicalizationReport::unknown`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::{debug, info};

use crate::identity::{CountryIdentity, CountryIdentityTable};
use crate::model::{Catalog, CatalogEntry, EventRecord, Slot};
use crate::normalize::exact_key;

/// Memo of spelling → identity resolutions for one run.
///
/// Catalogs repeat the same handful of spellings thousands of times; the
/// cache is passed in explicitly and dropped with the run.
#[derive(Debug, Default)]
pub struct LookupCache {
    resolved: HashMap<String, Option<CountryIdentity>>,
    hits: usize,
    misses: usize,
}

impl LookupCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `spelling`, consulting the table only on first sight.
    pub fn resolve(
        &mut self,
        table: &CountryIdentityTable,
        spelling: &str,
    ) -> Option<CountryIdentity> {
        if let Some(cached) = self.resolved.get(spelling) {
            self.hits += 1;
            return cached.clone();
        }
        self.misses += 1;
        let found = table.lookup(spelling).cloned();
        self.resolved.insert(spelling.to_string(), found.clone());
        found
    }

    #[must_use]
    pub const fn hits(&self) -> usize {
        self.hits
    }

    #[must_use]
    pub const fn misses(&self) -> usize {
        self.misses
    }
}

/// What happened to a record's country code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeChange {
    Unchanged,
    Filled,
    Changed,
    CaseNormalized,
}

/// Result of canonicalizing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Canonicalized {
    Known {
        /// Previous name when it was rewritten.
        renamed_from: Option<String>,
        code: CodeChange,
    },
    Unknown,
}

impl Canonicalized {
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        matches!(
            self,
            Self::Known {
                renamed_from: None,
                code: CodeChange::Unchanged
            }
        )
    }
}

/// Canonicalize the country fields of a single record in place.
///
/// # Examples
///
/// ```
/// use chronicle_core::canonicalize::{canonicalize, Canonicalized, CodeChange, LookupCache};
/// use chronicle_core::identity::{CountryDefinition, CountryIdentityTable};
/// use chronicle_core::model::EventRecord;
///
/// let table = CountryIdentityTable::from_definitions([
///     CountryDefinition::new("Türkiye", Some("TR")).with_aliases(["Turkiye"]),
/// ]);
/// let mut cache = LookupCache::new();
/// let mut record = EventRecord::new("e1", "Turkiye", 1980, "revolution", "12 Eylül Darbesi");
///
/// let outcome = canonicalize(&mut record, &table, &mut cache);
/// assert_eq!(record.country_name, "Türkiye");
/// assert_eq!(record.country_code.get().map(String::as_str), Some("TR"));
/// assert_eq!(
///     outcome,
///     Canonicalized::Known { renamed_from: Some("Turkiye".into()), code: CodeChange::Filled }
/// );
/// ```
pub fn canonicalize(
    record: &mut EventRecord,
    table: &CountryIdentityTable,
    cache: &mut LookupCache,
) -> Canonicalized {
    let Some(identity) = cache.resolve(table, &record.country_name) else {
        return Canonicalized::Unknown;
    };

    let renamed_from = if record.country_name == identity.name {
        None
    } else {
        Some(std::mem::replace(&mut record.country_name, identity.name))
    };

    let code = reconcile_code(&mut record.country_code, identity.code.as_deref());

    if renamed_from.is_some() || code != CodeChange::Unchanged {
        debug!(
            id = %record.id,
            from = renamed_from.as_deref().unwrap_or(&record.country_name),
            to = %record.country_name,
            ?code,
            "canonicalized country"
        );
    }

    Canonicalized::Known { renamed_from, code }
}

fn reconcile_code(slot: &mut Slot<String>, expected: Option<&str>) -> CodeChange {
    let current = slot.non_empty().map(str::to_string);
    match (current, expected) {
        (None, Some(code)) => {
            slot.set(code.to_string());
            CodeChange::Filled
        }
        (Some(cur), Some(code)) if cur == code => {
            if slot.get().is_some_and(|raw| raw.as_str() != code) {
                slot.set(code.to_string());
                CodeChange::CaseNormalized
            } else {
                CodeChange::Unchanged
            }
        }
        (Some(cur), Some(code)) => {
            slot.set(code.to_string());
            if cur.eq_ignore_ascii_case(code) {
                CodeChange::CaseNormalized
            } else {
                CodeChange::Changed
            }
        }
        (Some(cur), None) => {
            let upper = cur.to_uppercase();
            if slot.get().is_some_and(|raw| *raw != upper) {
                slot.set(upper);
                CodeChange::CaseNormalized
            } else {
                CodeChange::Unchanged
            }
        }
        (None, None) => CodeChange::Unchanged,
    }
}

/// Restricts a run to a set of countries, given in any accepted spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryFilter {
    /// Canonical names of spellings the table knows.
    names: BTreeSet<String>,
    /// Exact keys of spellings the table does not know.
    unknown_keys: BTreeSet<String>,
}

impl CountryFilter {
    /// Build a filter from user-supplied spellings.
    pub fn new<I, S>(spellings: I, table: &CountryIdentityTable) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        for spelling in spellings {
            let key = exact_key(spelling.as_ref());
            if key.is_empty() {
                continue;
            }
            match table.lookup_key(&key) {
                Some(id) => {
                    filter.names.insert(id.name.clone());
                }
                None => {
                    filter.unknown_keys.insert(key);
                }
            }
        }
        filter
    }

    /// Whether a record with this country name is in scope.
    #[must_use]
    pub fn matches(&self, country_name: &str, table: &CountryIdentityTable) -> bool {
        let key = exact_key(country_name);
        match table.lookup_key(&key) {
            Some(id) => self.names.contains(&id.name),
            None => self.unknown_keys.contains(&key),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.unknown_keys.is_empty()
    }
}

/// Counters for one canonicalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CanonicalizationReport {
    pub examined: usize,
    pub names_changed: usize,
    pub codes_filled: usize,
    pub codes_changed: usize,
    pub codes_case_normalized: usize,
    /// Unknown spelling → number of records using it.
    pub unknown: BTreeMap<String, usize>,
}

impl CanonicalizationReport {
    fn record(&mut self, spelling: &str, outcome: &Canonicalized) {
        self.examined += 1;
        match outcome {
            Canonicalized::Unknown => {
                *self.unknown.entry(spelling.to_string()).or_default() += 1;
            }
            Canonicalized::Known { renamed_from, code } => {
                if renamed_from.is_some() {
                    self.names_changed += 1;
                }
                match code {
                    CodeChange::Unchanged => {}
                    CodeChange::Filled => self.codes_filled += 1,
                    CodeChange::Changed => self.codes_changed += 1,
                    CodeChange::CaseNormalized => self.codes_case_normalized += 1,
                }
            }
        }
    }
}

/// Canonicalize every well-formed record in scope.
pub fn canonicalize_catalog(
    catalog: &mut Catalog,
    table: &CountryIdentityTable,
    filter: Option<&CountryFilter>,
    cache: &mut LookupCache,
) -> CanonicalizationReport {
    let mut report = CanonicalizationReport::default();

    for record in catalog.entries.iter_mut().filter_map(CatalogEntry::as_event_mut) {
        if filter.is_some_and(|f| !f.matches(&record.country_name, table)) {
            continue;
        }
        let spelling = record.country_name.clone();
        let outcome = canonicalize(record, table, cache);
        report.record(&spelling, &outcome);
    }

    info!(
        examined = report.examined,
        names_changed = report.names_changed,
        codes_filled = report.codes_filled,
        codes_changed = report.codes_changed,
        codes_case_normalized = report.codes_case_normalized,
        unknown = report.unknown.len(),
        cache_hits = cache.hits(),
        "canonicalized countries"
    );

    report
}
