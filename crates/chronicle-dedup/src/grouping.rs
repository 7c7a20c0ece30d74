//! Partition records into duplicate-equivalence classes.
//!
//! Records are bucketed by `(country_name, year)` and only compared within a
//! bucket. Every pair the cascade calls a duplicate is linked, and classes are
//! the connected components of those links. A bucket is a pure function of
//! its members, so buckets never influence each other.

use std::collections::BTreeMap;

use chronicle_core::model::{Catalog, EventRecord};
use chronicle_core::normalize::TokenNormalizer;
use serde::Serialize;
use tracing::debug;

use crate::disjoint::DisjointSet;
use crate::rules::{Candidate, Cascade, Decision, PairContext, RuleKind};
use crate::similarity::TitleKeys;

/// The `(country, year)` partition a record belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BucketKey {
    pub country: String,
    pub year: i64,
}

impl BucketKey {
    #[must_use]
    pub fn of(record: &EventRecord) -> Self {
        Self {
            country: record.country_name.clone(),
            year: record.year,
        }
    }
}

/// One duplicate edge and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub a: String,
    pub b: String,
    pub rule: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub char_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_ratio: Option<f64>,
}

/// Records judged to describe the same event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquivalenceClass {
    pub bucket: BucketKey,
    /// Catalog indices, ascending.
    pub members: Vec<usize>,
    pub ids: Vec<String>,
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Grouping {
    /// Classes with at least two members, bucket order then catalog order.
    pub classes: Vec<EquivalenceClass>,
    pub buckets: usize,
    pub records: usize,
    pub comparisons: usize,
}

/// A bucket's members with their title keys.
#[derive(Debug)]
pub struct Bucket<'c> {
    pub key: BucketKey,
    pub members: Vec<(usize, &'c EventRecord, TitleKeys)>,
}

impl<'c> Bucket<'c> {
    #[must_use]
    pub fn candidate(&self, pos: usize) -> Candidate<'_> {
        let (_, record, keys) = &self.members[pos];
        Candidate { record, keys }
    }

    /// Run the cascade on members `i` and `j`.
    #[must_use]
    pub fn decide(&self, cascade: &Cascade, i: usize, j: usize) -> Decision {
        cascade.decide(&PairContext::new(self.candidate(i), self.candidate(j)))
    }

    fn id(&self, pos: usize) -> &'c str {
        &self.members[pos].1.id
    }
}

/// Split the in-scope events into `(country, year)` buckets.
pub fn bucketize<'c>(
    catalog: &'c Catalog,
    normalizer: &TokenNormalizer,
    in_scope: impl Fn(&EventRecord) -> bool,
) -> Vec<Bucket<'c>> {
    let mut buckets: BTreeMap<BucketKey, Vec<(usize, &'c EventRecord, TitleKeys)>> =
        BTreeMap::new();
    for (index, record) in catalog.events() {
        if !in_scope(record) {
            continue;
        }
        let keys = TitleKeys::new(&record.title, normalizer);
        buckets
            .entry(BucketKey::of(record))
            .or_default()
            .push((index, record, keys));
    }
    buckets
        .into_iter()
        .map(|(key, members)| Bucket { key, members })
        .collect()
}

/// Components of the duplicate graph inside one bucket, plus its links.
fn components(bucket: &Bucket<'_>, cascade: &Cascade) -> (Vec<Vec<usize>>, Vec<Link>, usize) {
    let mut ds = DisjointSet::new();
    let mut links = Vec::new();
    let mut comparisons = 0;

    for i in 0..bucket.members.len() {
        ds.insert(i);
    }
    for i in 0..bucket.members.len() {
        for j in (i + 1)..bucket.members.len() {
            comparisons += 1;
            let decision = bucket.decide(cascade, i, j);
            let Some(rule) = decision.rule.filter(|_| decision.is_duplicate()) else {
                continue;
            };
            ds.union(&i, &j);
            links.push(Link {
                a: bucket.id(i).to_string(),
                b: bucket.id(j).to_string(),
                rule,
                char_ratio: decision.char_ratio,
                token_ratio: decision.token_ratio,
            });
        }
    }

    (ds.components(), links, comparisons)
}

/// Group one bucket into classes of two or more records.
#[must_use]
pub fn group_bucket(bucket: &Bucket<'_>, cascade: &Cascade) -> (Vec<EquivalenceClass>, usize) {
    let (components, links, comparisons) = components(bucket, cascade);

    let classes = components
        .into_iter()
        .filter(|members| members.len() > 1)
        .map(|positions| {
            let ids: Vec<String> = positions.iter().map(|&p| bucket.id(p).to_string()).collect();
            let class_links = links
                .iter()
                .filter(|l| ids.contains(&l.a))
                .cloned()
                .collect();
            EquivalenceClass {
                bucket: bucket.key.clone(),
                members: positions.iter().map(|&p| bucket.members[p].0).collect(),
                ids,
                links: class_links,
            }
        })
        .collect();

    (classes, comparisons)
}

/// Group every in-scope record of the catalog.
pub fn group(
    catalog: &Catalog,
    cascade: &Cascade,
    normalizer: &TokenNormalizer,
    in_scope: impl Fn(&EventRecord) -> bool,
) -> Grouping {
    let buckets = bucketize(catalog, normalizer, in_scope);
    let mut grouping = Grouping {
        buckets: buckets.len(),
        records: buckets.iter().map(|b| b.members.len()).sum(),
        ..Grouping::default()
    };

    for bucket in &buckets {
        let (classes, comparisons) = group_bucket(bucket, cascade);
        grouping.comparisons += comparisons;
        for class in &classes {
            debug!(
                country = %class.bucket.country,
                year = class.bucket.year,
                ids = ?class.ids,
                "duplicate class"
            );
        }
        grouping.classes.extend(classes);
    }

    grouping
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::model::{CatalogEntry, Slot};

    fn event(id: &str, country: &str, year: i64, category: &str, title: &str) -> EventRecord {
        EventRecord::new(id, country, year, category, title)
    }

    fn catalog(events: Vec<EventRecord>) -> Catalog {
        Catalog::new(
            serde_json::Map::new(),
            events.into_iter().map(CatalogEntry::Event).collect(),
        )
    }

    fn run(c: &Catalog) -> Grouping {
        group(c, &Cascade::default(), &TokenNormalizer::default(), |_| true)
    }

    #[test]
    fn groups_within_bucket_only() {
        let c = catalog(vec![
            event("a", "Fransa", 1937, "war", "Guernica Bombardımanı"),
            event("b", "Fransa", 1938, "war", "Guernica Bombardımanı"),
            event("c", "İspanya", 1937, "war", "Guernica Bombardımanı"),
            event("d", "Fransa", 1937, "war", "guernica bombardımanı!"),
        ]);
        let g = run(&c);
        assert_eq!(g.buckets, 3);
        assert_eq!(g.classes.len(), 1);
        assert_eq!(g.classes[0].ids, ["a", "d"]);
        assert_eq!(g.classes[0].members, [0, 3]);
        assert_eq!(g.classes[0].links[0].rule, RuleKind::ExactTitleKey);
        assert_eq!(g.comparisons, 1);
    }

    #[test]
    fn transitive_links_form_one_class() {
        let link = "https://tr.wikipedia.org/wiki/X";
        let mut a = event("a", "Fransa", 1968, "protest", "Mayıs 68 Olayları");
        a.external_link = Slot::Value(link.into());
        let mut b = event("b", "Fransa", 1968, "protest", "Paris Öğrenci Ayaklanması");
        b.external_link = Slot::Value(link.into());
        let c = event("c", "Fransa", 1968, "protest", "paris ogrenci ayaklanmasi");

        let g = run(&catalog(vec![a, b, c]));
        assert_eq!(g.classes.len(), 1);
        assert_eq!(g.classes[0].ids, ["a", "b", "c"]);
        assert_eq!(g.classes[0].links.len(), 2);
    }

    #[test]
    fn singletons_are_not_classes() {
        let g = run(&catalog(vec![
            event("a", "Fransa", 1937, "culture", "Picasso Guernica'yı Yarattı"),
            event("b", "Fransa", 1937, "war", "İspanya İç Savaşı"),
        ]));
        assert!(g.classes.is_empty());
        assert_eq!(g.records, 2);
    }

    #[test]
    fn scope_predicate_limits_records() {
        let c = catalog(vec![
            event("a", "Fransa", 1937, "war", "Guernica"),
            event("b", "Fransa", 1937, "war", "Guernica"),
        ]);
        let g = group(
            &c,
            &Cascade::default(),
            &TokenNormalizer::default(),
            |r| r.country_name != "Fransa",
        );
        assert_eq!(g.records, 0);
        assert!(g.classes.is_empty());
    }
}
