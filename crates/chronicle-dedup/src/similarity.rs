//! Title similarity metrics.
//!
//! Two metrics feed the duplicate cascade:
//!
//! - [`sequence_ratio`]: Ratcliff/Obershelp matching-blocks ratio `2·M/T`
//!   over characters, where `M` is the number of characters in matching
//!   blocks and `T` the combined length.
//! - [`jaccard`]: overlap of normalized token sets.
//!
//! [`TitleKeys`] precomputes both normalized forms once per record so that a
//! bucket of `n` records costs `n` normalizations rather than `n²`.

use std::collections::{BTreeSet, HashMap};

use chronicle_core::normalize::{TokenNormalizer, exact_key};

// ---------------------------------------------------------------------------
// TitleKeys
// ---------------------------------------------------------------------------

/// Normalized forms of one record's title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleKeys {
    /// Exact-key form.
    pub exact: String,
    /// Token-mode set.
    pub tokens: BTreeSet<String>,
    chars: Vec<char>,
}

impl TitleKeys {
    #[must_use]
    pub fn new(title: &str, normalizer: &TokenNormalizer) -> Self {
        let exact = exact_key(title);
        let tokens = normalizer.tokens_from_key(&exact);
        let chars = exact.chars().collect();
        Self {
            exact,
            tokens,
            chars,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Character ratio between two exact keys; `0.0` when either is empty.
    ///
    /// The block search is not symmetric, so the keys are always compared in
    /// a fixed order and `a.char_ratio(b) == b.char_ratio(a)`.
    #[must_use]
    pub fn char_ratio(&self, other: &Self) -> f64 {
        if self.chars.is_empty() || other.chars.is_empty() {
            return 0.0;
        }
        if self.chars <= other.chars {
            ratio_of(&self.chars, &other.chars)
        } else {
            ratio_of(&other.chars, &self.chars)
        }
    }

    #[must_use]
    pub fn token_ratio(&self, other: &Self) -> f64 {
        jaccard(&self.tokens, &other.tokens)
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Ratcliff/Obershelp similarity of two strings, in `[0.0, 1.0]`.
///
/// Finds the longest common block, recurses on the unmatched pieces to its
/// left and right, and scores `2 * matched / (len(a) + len(b))`. Two empty
/// strings are identical (`1.0`).
///
/// ```
/// use chronicle_dedup::similarity::sequence_ratio;
///
/// assert_eq!(sequence_ratio("abcd", "abcd"), 1.0);
/// assert_eq!(sequence_ratio("abcd", "wxyz"), 0.0);
/// assert!((sequence_ratio("abcd", "bcde") - 0.75).abs() < 1e-9);
/// ```
#[must_use]
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_of(&a, &b)
}

fn ratio_of(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_characters(a, b);
    #[allow(clippy::cast_precision_loss)]
    let ratio = (2 * matched) as f64 / total as f64;
    ratio
}

/// Total length of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        positions.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, &positions, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest block `a[i..i+k] == b[j..j+k]` inside the given windows.
///
/// Among equally long blocks the one starting earliest in `a` wins, then the
/// one starting earliest in `b`.
fn longest_match(
    a: &[char],
    positions: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run length of the match ending at (i - 1, j), keyed by j
    let mut run_ending: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next: HashMap<usize, usize> = HashMap::new();
        for &j in positions.get(c).map_or(&[][..], Vec::as_slice) {
            if j < blo {
                continue;
            }
            if j >= bhi {
                break;
            }
            let k = j
                .checked_sub(1)
                .and_then(|prev| run_ending.get(&prev))
                .copied()
                .unwrap_or(0)
                + 1;
            next.insert(j, k);
            if k > best_k {
                best_i = i + 1 - k;
                best_j = j + 1 - k;
                best_k = k;
            }
        }
        run_ending = next;
    }

    (best_i, best_j, best_k)
}

/// Jaccard overlap `|A ∩ B| / |A ∪ B|`; `0.0` when either set is empty.
///
/// ```
/// use std::collections::BTreeSet;
/// use chronicle_dedup::similarity::jaccard;
///
/// let a: BTreeSet<String> = ["berlin", "duvari"].iter().map(|s| s.to_string()).collect();
/// let b: BTreeSet<String> = ["berlin", "duvarinin"].iter().map(|s| s.to_string()).collect();
/// assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-9);
/// assert_eq!(jaccard(&a, &BTreeSet::new()), 0.0);
/// ```
#[must_use]
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    #[allow(clippy::cast_precision_loss)]
    let ratio = intersection as f64 / union as f64;
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn ratio_identical_and_disjoint() {
        assert!(close(sequence_ratio("guernica", "guernica"), 1.0));
        assert!(close(sequence_ratio("abc", "xyz"), 0.0));
        assert!(close(sequence_ratio("", ""), 1.0));
        assert!(close(sequence_ratio("abc", ""), 0.0));
    }

    #[test]
    fn ratio_matches_matching_blocks_definition() {
        // blocks "ab" + "d": 2 * 3 / 8
        assert!(close(sequence_ratio("abxd", "abcd"), 0.75));
        // "the silence of the lambs" vs "silence of the lambs": 2 * 20 / 44
        assert!(close(
            sequence_ratio("the silence of the lambs", "silence of the lambs"),
            40.0 / 44.0
        ));
    }

    #[test]
    fn ratio_prefers_earliest_longest_block() {
        // longest block "ab" appears twice in b; the earliest is used and the
        // remaining "ab" in a can still match to its right.
        assert!(close(sequence_ratio("abab", "ab"), 2.0 * 2.0 / 6.0));
        assert!(close(sequence_ratio("abcab", "ab"), 4.0 / 7.0));
    }

    #[test]
    fn ratio_is_not_fooled_by_transposition() {
        // Ratcliff/Obershelp is order sensitive: only one of the two words
        // can be part of the matching blocks.
        let r = sequence_ratio("berlin duvari", "duvari berlin");
        assert!(r < 0.6, "{r}");
    }

    #[test]
    fn known_title_pairs() {
        let near = sequence_ratio("12 eylul darbesi", "12 eylul askeri darbesi");
        assert!(near > 0.8 && near < 0.85, "{near}");

        let wall = sequence_ratio("berlin duvarinin yikilisi", "berlin duvarinin yikilmasi");
        assert!(wall > 0.88 && wall < 0.95, "{wall}");
    }

    #[test]
    fn jaccard_basics() {
        let set = |xs: &[&str]| xs.iter().map(|s| (*s).to_string()).collect::<BTreeSet<_>>();
        assert!(close(jaccard(&set(&["a", "b"]), &set(&["a", "b"])), 1.0));
        assert!(close(jaccard(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 / 3.0));
        assert!(close(jaccard(&set(&[]), &set(&[])), 0.0));
    }

    #[test]
    fn title_keys_char_ratio_guards_empty() {
        let tn = TokenNormalizer::default();
        let empty = TitleKeys::new("?!", &tn);
        assert!(empty.is_empty());
        assert!(close(empty.char_ratio(&TitleKeys::new("...", &tn)), 0.0));

        let a = TitleKeys::new("The Silence of the Lambs", &tn);
        let b = TitleKeys::new("Silence of the Lambs", &tn);
        assert!(close(a.token_ratio(&b), 1.0));
        assert!(a.char_ratio(&b) > 0.90);
    }

    #[test]
    fn title_keys_char_ratio_is_symmetric() {
        let tn = TokenNormalizer::default();
        let a = TitleKeys::new("abcab", &tn);
        let b = TitleKeys::new("bca", &tn);
        assert!(close(a.char_ratio(&b), b.char_ratio(&a)));
    }
}
