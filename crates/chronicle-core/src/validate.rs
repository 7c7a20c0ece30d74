//! Post-run consistency checks over the whole catalog.
//!
//! Every record is checked against every rule; nothing short-circuits, so a
//! single run reports all problems at once. Malformed entries are not
//! validated here; the catalog reports them separately.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::canonicalize::CountryFilter;
use crate::identity::CountryIdentityTable;
use crate::model::{Catalog, EventRecord};
use crate::normalize::exact_key;

const MISSING: &str = "<missing>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Known country spelled other than canonically.
    NonCanonicalCountry,
    /// Country not in the identity table.
    UnknownCountry,
    CountryCodeMismatch,
    DuplicateTitle,
    UnknownCategory,
    DecadeMismatch,
}

impl ViolationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonCanonicalCountry => "non_canonical_country",
            Self::UnknownCountry => "unknown_country",
            Self::CountryCodeMismatch => "country_code_mismatch",
            Self::DuplicateTitle => "duplicate_title",
            Self::UnknownCategory => "unknown_category",
            Self::DecadeMismatch => "decade_mismatch",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One broken invariant on one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Position in the `events` array.
    pub index: usize,
    pub id: String,
    pub kind: ViolationKind,
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {} expected {:?}, found {:?}",
            self.index, self.id, self.kind, self.field, self.expected, self.actual
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Report unknown countries as notices instead of violations.
    pub allow_unknown_countries: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub violations: Vec<Violation>,
    /// Findings that are reported but do not fail the run.
    pub notices: Vec<Violation>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violation counts per kind, in kind order.
    #[must_use]
    pub fn counts(&self) -> Vec<(ViolationKind, usize)> {
        let mut counts: BTreeMap<ViolationKind, usize> = BTreeMap::new();
        for v in &self.violations {
            *counts.entry(v.kind).or_default() += 1;
        }
        counts.into_iter().collect()
    }
}

/// Check every in-scope record against the catalog invariants.
///
/// Category membership is checked against the catalog's own `categories`
/// table.
#[must_use]
pub fn validate(
    catalog: &Catalog,
    table: &CountryIdentityTable,
    options: ValidationOptions,
    filter: Option<&CountryFilter>,
) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut first_title: HashMap<(String, i64, String), (usize, String)> = HashMap::new();

    for (index, record) in catalog.events() {
        if filter.is_some_and(|f| !f.matches(&record.country_name, table)) {
            continue;
        }
        report.checked += 1;

        let mut emit = |kind: ViolationKind,
                        field: &'static str,
                        expected: String,
                        actual: String| {
            let violation = Violation {
                index,
                id: record.id.clone(),
                kind,
                field,
                expected,
                actual,
            };
            if kind == ViolationKind::UnknownCountry && options.allow_unknown_countries {
                report.notices.push(violation);
            } else {
                report.violations.push(violation);
            }
        };

        check_country(record, table, &mut emit);

        // Titles with no key (punctuation only, blank) never match each other.
        let title_key = exact_key(&record.title);
        if !title_key.is_empty() {
            let bucket = (record.country_name.clone(), record.year, title_key);
            match first_title.entry(bucket) {
                Entry::Occupied(first) => {
                    let (first_index, first_id) = first.get();
                    emit(
                        ViolationKind::DuplicateTitle,
                        "title",
                        "unique title per country and year".to_string(),
                        format!("same as {first_id} at index {first_index}"),
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert((index, record.id.clone()));
                }
            }
        }

        if !catalog.has_category(&record.category) {
            emit(
                ViolationKind::UnknownCategory,
                "category",
                "a key of the categories table".to_string(),
                record.category.clone(),
            );
        }

        let expected_decade = record.expected_decade();
        let actual_decade = record.decade.get().map_or(MISSING, String::as_str);
        if actual_decade != expected_decade {
            let actual = actual_decade.to_string();
            emit(ViolationKind::DecadeMismatch, "decade", expected_decade, actual);
        }
    }

    if !report.is_clean() {
        tracing::info!(
            checked = report.checked,
            violations = report.violations.len(),
            notices = report.notices.len(),
            "validation found violations"
        );
    }

    report
}

fn check_country(
    record: &EventRecord,
    table: &CountryIdentityTable,
    emit: &mut impl FnMut(ViolationKind, &'static str, String, String),
) {
    let identity = table
        .by_canonical_name(&record.country_name)
        .or_else(|| table.lookup(&record.country_name));

    let Some(identity) = identity else {
        emit(
            ViolationKind::UnknownCountry,
            "country_name",
            "a name from the identity table".to_string(),
            record.country_name.clone(),
        );
        return;
    };

    if identity.name != record.country_name {
        emit(
            ViolationKind::NonCanonicalCountry,
            "country_name",
            identity.name.clone(),
            record.country_name.clone(),
        );
    }

    if let Some(code) = &identity.code {
        let actual = record.country_code.get().map_or(MISSING, String::as_str);
        if actual != code.as_str() {
            emit(
                ViolationKind::CountryCodeMismatch,
                "country_code",
                code.clone(),
                actual.to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CountryDefinition;
    use crate::model::{CatalogEntry, Slot};
    use serde_json::json;

    fn table() -> CountryIdentityTable {
        CountryIdentityTable::from_definitions([
            CountryDefinition::new("Türkiye", Some("TR")).with_english("Turkey"),
            CountryDefinition::new("Fransa", Some("FR")),
            CountryDefinition::new("Kosova", None),
        ])
    }

    fn event(id: &str, country: &str, code: Option<&str>, year: i64, title: &str) -> EventRecord {
        let mut r = EventRecord::new(id, country, year, "war", title);
        if let Some(code) = code {
            r.country_code = Slot::Value(code.to_string());
        }
        r
    }

    fn catalog(events: Vec<EventRecord>) -> Catalog {
        let mut categories = serde_json::Map::new();
        categories.insert("war".into(), json!({"label": "Savaş"}));
        categories.insert("culture".into(), json!({"label": "Kültür"}));
        Catalog::new(categories, events.into_iter().map(CatalogEntry::Event).collect())
    }

    fn kinds(report: &ValidationReport) -> Vec<ViolationKind> {
        report.violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn clean_catalog_has_no_violations() {
        let c = catalog(vec![
            event("a", "Türkiye", Some("TR"), 1980, "12 Eylül Darbesi"),
            event("b", "Fransa", Some("FR"), 1937, "Guernica"),
            event("c", "Kosova", None, 2008, "Bağımsızlık"),
        ]);
        let report = validate(&c, &table(), ValidationOptions::default(), None);
        assert!(report.is_clean(), "{:?}", report.violations);
        assert_eq!(report.checked, 3);
    }

    #[test]
    fn reports_every_problem_on_a_record() {
        let mut bad = event("a", "Turkey", Some("tr"), 1987, "x");
        bad.decade = Slot::Value("1990s".into());
        bad.category = "terror".into();
        let report = validate(&catalog(vec![bad]), &table(), ValidationOptions::default(), None);
        assert_eq!(
            kinds(&report),
            vec![
                ViolationKind::NonCanonicalCountry,
                ViolationKind::CountryCodeMismatch,
                ViolationKind::UnknownCategory,
                ViolationKind::DecadeMismatch,
            ]
        );
        let decade = &report.violations[3];
        assert_eq!(decade.expected, "1980s");
        assert_eq!(decade.actual, "1990s");
        assert_eq!(decade.field, "decade");
    }

    #[test]
    fn missing_code_is_a_mismatch_when_table_has_one() {
        let report = validate(
            &catalog(vec![event("a", "Fransa", None, 1937, "x")]),
            &table(),
            ValidationOptions::default(),
            None,
        );
        assert_eq!(kinds(&report), vec![ViolationKind::CountryCodeMismatch]);
        assert_eq!(report.violations[0].actual, MISSING);
    }

    #[test]
    fn duplicate_titles_in_same_bucket() {
        let c = catalog(vec![
            event("a", "Fransa", Some("FR"), 1937, "Guernica"),
            event("b", "Fransa", Some("FR"), 1937, "GUERNICA!"),
            event("c", "Fransa", Some("FR"), 1938, "Guernica"),
        ]);
        let report = validate(&c, &table(), ValidationOptions::default(), None);
        assert_eq!(kinds(&report), vec![ViolationKind::DuplicateTitle]);
        assert_eq!(report.violations[0].id, "b");
        assert_eq!(report.violations[0].index, 1);
        assert!(report.violations[0].actual.contains('a'));
    }

    #[test]
    fn keyless_titles_are_not_duplicates() {
        let c = catalog(vec![
            event("a", "Fransa", Some("FR"), 1937, "?!"),
            event("b", "Fransa", Some("FR"), 1937, "..."),
            event("c", "Fransa", Some("FR"), 1937, "   "),
        ]);
        let report = validate(&c, &table(), ValidationOptions::default(), None);
        assert!(report.is_clean(), "{:?}", report.violations);
    }

    #[test]
    fn unknown_country_can_be_downgraded() {
        let c = catalog(vec![event("a", "Atlantis", None, 1900, "x")]);
        let strict = validate(&c, &table(), ValidationOptions::default(), None);
        assert_eq!(kinds(&strict), vec![ViolationKind::UnknownCountry]);

        let lenient = validate(
            &c,
            &table(),
            ValidationOptions {
                allow_unknown_countries: true,
            },
            None,
        );
        assert!(lenient.is_clean());
        assert_eq!(lenient.notices.len(), 1);
    }

    #[test]
    fn filter_limits_scope() {
        let t = table();
        let c = catalog(vec![
            event("a", "Fransa", Some("FR"), 1937, "x"),
            event("b", "Atlantis", None, 1900, "x"),
        ]);
        let filter = CountryFilter::new(["France", "Fransa"], &t);
        let report = validate(&c, &t, ValidationOptions::default(), Some(&filter));
        assert!(report.is_clean());
        assert_eq!(report.checked, 1);
    }

    #[test]
    fn counts_group_by_kind() {
        let c = catalog(vec![
            event("a", "Atlantis", None, 1900, "x"),
            event("b", "Narnia", None, 1900, "x"),
        ]);
        let report = validate(&c, &table(), ValidationOptions::default(), None);
        assert_eq!(report.counts(), vec![(ViolationKind::UnknownCountry, 2)]);
    }
}
