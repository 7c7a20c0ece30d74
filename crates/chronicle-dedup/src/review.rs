//! Near-miss listing for human review.
//!
//! A near miss is a same-bucket pair the cascade did not merge but whose
//! titles are close enough that a person should look. Nothing here changes
//! the catalog.

use chronicle_core::config::ReviewConfig;
use chronicle_core::model::{Catalog, EventRecord};
use chronicle_core::normalize::TokenNormalizer;
use serde::Serialize;

use crate::grouping::{BucketKey, bucketize};
use crate::rules::{Cascade, PairContext, RuleKind};

/// Minimum ratios for a non-merged pair to be listed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewFloors {
    pub char_ratio: f64,
    pub token_ratio: f64,
}

impl Default for ReviewFloors {
    fn default() -> Self {
        Self::from(&ReviewConfig::default())
    }
}

impl From<&ReviewConfig> for ReviewFloors {
    fn from(config: &ReviewConfig) -> Self {
        Self {
            char_ratio: config.char_ratio,
            token_ratio: config.token_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSide {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub category: String,
}

impl ReviewSide {
    fn new(index: usize, record: &EventRecord) -> Self {
        Self {
            index,
            id: record.id.clone(),
            title: record.title.clone(),
            category: record.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearMiss {
    pub bucket: BucketKey,
    pub a: ReviewSide,
    pub b: ReviewSide,
    pub char_ratio: f64,
    pub token_ratio: f64,
    /// Rule that rejected the pair; `None` when no rule matched.
    pub rejected_by: Option<RuleKind>,
}

/// List non-merged pairs with char ratio or token ratio at or above the
/// floors, in bucket order then catalog order.
pub fn near_misses(
    catalog: &Catalog,
    cascade: &Cascade,
    normalizer: &TokenNormalizer,
    floors: ReviewFloors,
    in_scope: impl Fn(&EventRecord) -> bool,
) -> Vec<NearMiss> {
    let mut out = Vec::new();

    for bucket in bucketize(catalog, normalizer, in_scope) {
        let n = bucket.members.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let pair = PairContext::new(bucket.candidate(i), bucket.candidate(j));
                let decision = cascade.decide(&pair);
                if decision.is_duplicate() {
                    continue;
                }
                let (char_ratio, token_ratio) = (pair.char_ratio(), pair.token_ratio());
                if char_ratio < floors.char_ratio && token_ratio < floors.token_ratio {
                    continue;
                }
                let (ia, a, _) = &bucket.members[i];
                let (ib, b, _) = &bucket.members[j];
                out.push(NearMiss {
                    bucket: bucket.key.clone(),
                    a: ReviewSide::new(*ia, a),
                    b: ReviewSide::new(*ib, b),
                    char_ratio,
                    token_ratio,
                    rejected_by: decision.rule,
                });
            }
        }
    }

    out
}
