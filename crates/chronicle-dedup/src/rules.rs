//! The duplicate decision cascade.
//!
//! A [`Cascade`] is an ordered list of named rules. Each rule looks at a pair
//! of records and either decides (duplicate / distinct) or passes. The first
//! rule that decides wins; if none does, the pair is distinct.
//!
//! Default order:
//!
//! 1. `shared_external_link`: same non-empty encyclopedia link.
//! 2. `exact_title_key`: identical non-empty exact-key titles.
//! 3. `near_identical_title`: character ratio at or above 0.97.
//! 4. `category_mismatch`: different categories are never merged past here.
//! 5. `fuzzy_title`: (char ≥ 0.90 and token ≥ 0.90) or
//!    (identical token sets and char ≥ 0.88).

use std::cell::OnceCell;
use std::fmt;
use std::str::FromStr;

use chronicle_core::config::MatchingConfig;
use chronicle_core::error::ErrorCode;
use chronicle_core::model::EventRecord;
use serde::{Deserialize, Serialize};

use crate::similarity::TitleKeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    SharedExternalLink,
    ExactTitleKey,
    NearIdenticalTitle,
    CategoryMismatch,
    FuzzyTitle,
}

impl RuleKind {
    pub const ALL: [Self; 5] = [
        Self::SharedExternalLink,
        Self::ExactTitleKey,
        Self::NearIdenticalTitle,
        Self::CategoryMismatch,
        Self::FuzzyTitle,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SharedExternalLink => "shared_external_link",
            Self::ExactTitleKey => "exact_title_key",
            Self::NearIdenticalTitle => "near_identical_title",
            Self::CategoryMismatch => "category_mismatch",
            Self::FuzzyTitle => "fuzzy_title",
        }
    }

    /// Apply this rule to a pair. `None` means the rule does not decide.
    #[must_use]
    pub fn evaluate(self, pair: &PairContext<'_>, thresholds: &Thresholds) -> Option<Verdict> {
        match self {
            Self::SharedExternalLink => {
                let a = pair.a.record.external_link.non_empty()?;
                let b = pair.b.record.external_link.non_empty()?;
                (a == b).then_some(Verdict::Duplicate)
            }
            Self::ExactTitleKey => {
                let (a, b) = (&pair.a.keys.exact, &pair.b.keys.exact);
                (!a.is_empty() && a == b).then_some(Verdict::Duplicate)
            }
            Self::NearIdenticalTitle => {
                (pair.char_ratio() >= thresholds.near_identical).then_some(Verdict::Duplicate)
            }
            Self::CategoryMismatch => {
                (pair.a.record.category != pair.b.record.category).then_some(Verdict::Distinct)
            }
            Self::FuzzyTitle => {
                let char_ratio = pair.char_ratio();
                let both_high = char_ratio >= thresholds.char_ratio
                    && pair.token_ratio() >= thresholds.token_ratio;
                let same_tokens =
                    pair.tokens_identical() && char_ratio >= thresholds.exact_token_char_ratio;
                (both_high || same_tokens).then_some(Verdict::Duplicate)
            }
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("{}: unknown matching rule `{0}`", ErrorCode::UnknownRule.code())]
    Unknown(String),
}

impl RuleError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::UnknownRule
    }
}

impl FromStr for RuleKind {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|rule| rule.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RuleError::Unknown(wanted.to_string()))
    }
}

/// Numeric cut-offs used by the title rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub near_identical: f64,
    pub char_ratio: f64,
    pub token_ratio: f64,
    pub exact_token_char_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

impl From<&MatchingConfig> for Thresholds {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            near_identical: config.near_identical_ratio,
            char_ratio: config.char_ratio,
            token_ratio: config.token_ratio,
            exact_token_char_ratio: config.exact_token_char_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Duplicate,
    Distinct,
}

/// A record together with its precomputed title keys.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub record: &'a EventRecord,
    pub keys: &'a TitleKeys,
}

/// Pair under comparison. Ratios are computed at most once, and only when a
/// rule asks for them.
#[derive(Debug)]
pub struct PairContext<'a> {
    pub a: Candidate<'a>,
    pub b: Candidate<'a>,
    char_ratio: OnceCell<f64>,
    token_ratio: OnceCell<f64>,
}

impl<'a> PairContext<'a> {
    #[must_use]
    pub const fn new(a: Candidate<'a>, b: Candidate<'a>) -> Self {
        Self {
            a,
            b,
            char_ratio: OnceCell::new(),
            token_ratio: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn char_ratio(&self) -> f64 {
        *self
            .char_ratio
            .get_or_init(|| self.a.keys.char_ratio(self.b.keys))
    }

    #[must_use]
    pub fn token_ratio(&self) -> f64 {
        *self
            .token_ratio
            .get_or_init(|| self.a.keys.token_ratio(self.b.keys))
    }

    /// Token sets are equal and non-empty (token ratio exactly 1).
    #[must_use]
    pub fn tokens_identical(&self) -> bool {
        !self.a.keys.tokens.is_empty() && self.a.keys.tokens == self.b.keys.tokens
    }
}

/// Outcome of running the cascade on one pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub verdict: Verdict,
    /// Rule that decided; `None` when every rule passed.
    pub rule: Option<RuleKind>,
    /// Ratios, when the cascade needed them.
    pub char_ratio: Option<f64>,
    pub token_ratio: Option<f64>,
}

impl Decision {
    #[must_use]
    pub fn is_duplicate(&self) -> bool {
        self.verdict == Verdict::Duplicate
    }
}

/// Ordered rule list plus thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    rules: Vec<RuleKind>,
    thresholds: Thresholds,
}

impl Default for Cascade {
    fn default() -> Self {
        Self::new(RuleKind::ALL.to_vec(), Thresholds::default())
    }
}

impl Cascade {
    #[must_use]
    pub const fn new(rules: Vec<RuleKind>, thresholds: Thresholds) -> Self {
        Self { rules, thresholds }
    }

    /// Build from the `[matching]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Unknown`] for a rule name that does not exist.
    pub fn from_config(config: &MatchingConfig) -> Result<Self, RuleError> {
        let rules = config
            .rules
            .iter()
            .map(|name| name.parse())
            .collect::<Result<Vec<RuleKind>, _>>()?;
        Ok(Self::new(rules, Thresholds::from(config)))
    }

    #[must_use]
    pub fn rules(&self) -> &[RuleKind] {
        &self.rules
    }

    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Run the rules in order on `pair`.
    #[must_use]
    pub fn decide(&self, pair: &PairContext<'_>) -> Decision {
        let decided = self
            .rules
            .iter()
            .find_map(|rule| rule.evaluate(pair, &self.thresholds).map(|v| (v, *rule)));

        let (verdict, rule) = match decided {
            Some((verdict, rule)) => (verdict, Some(rule)),
            None => (Verdict::Distinct, None),
        };

        Decision {
            verdict,
            rule,
            char_ratio: pair.char_ratio.get().copied(),
            token_ratio: pair.token_ratio.get().copied(),
        }
    }

    /// Convenience wrapper: do `a` and `b` describe the same event?
    #[must_use]
    pub fn is_probable_duplicate(&self, a: Candidate<'_>, b: Candidate<'_>) -> bool {
        self.decide(&PairContext::new(a, b)).is_duplicate()
    }
}
