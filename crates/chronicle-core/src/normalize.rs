//! Text normalization for matching titles and country spellings.
//!
//! Two modes are provided:
//!
//! - **Exact-key** ([`exact_key`]): diacritic folding, case folding, quote and
//!   dash canonicalization, punctuation stripping, whitespace collapsing. Used
//!   for exact comparisons (country lookup, title identity, validation).
//! - **Token** ([`TokenNormalizer::tokens`]): exact-key, then split into words,
//!   dropping short tokens and stopwords. Used for Jaccard overlap.
//!
//! Neither mode can fail; empty or whitespace-only input yields an empty key.

use std::collections::{BTreeSet, HashSet};

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Default minimum token length (in characters) kept by token normalization.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 3;

/// Function words and generic suffix words ignored when comparing titles by
/// token overlap. Entries are normalized on load, so accented and ASCII forms
/// are equivalent.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    // Turkish
    "ve", "ile", "da", "de", "bir", "bu", "şu", "için", "dönemi", "krizi", "kriz", "olayı",
    "hareketi", "hükümeti", "yasası", "anlaşması", "savaş", "savaşı", "çatışma", "çatışması",
    // English
    "the", "a", "an", "of", "and", "in", "on", "to", "for", "crisis", "movement",
    "government", "war",
];

/// Normalize text into its exact-match key.
///
/// # Examples
///
/// ```
/// use chronicle_core::normalize::exact_key;
///
/// assert_eq!(exact_key("Türkiye"), "turkiye");
/// assert_eq!(exact_key("  Côte d’Ivoire "), "cote divoire");
/// assert_eq!(exact_key("Berlin Duvarı’nın Yıkılışı!"), "berlin duvarinin yikilisi");
/// assert_eq!(exact_key("   "), "");
/// ```
#[must_use]
pub fn exact_key(text: &str) -> String {
    let replaced = replace_special_chars(text);

    let folded: String = replaced
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();

    let stripped: String = folded
        .chars()
        .filter(|c| !matches!(c, '\'' | '"' | '`'))
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || c == '-' || c == ':' {
                c
            } else {
                ' '
            }
        })
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map letters that do not decompose under NFKD, and typographic quotes and
/// dashes, onto their ASCII counterparts.
fn replace_special_chars(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            // Turkish
            'İ' => out.push('I'),
            'ı' => out.push('i'),
            // Polish
            'Ł' => out.push('L'),
            'ł' => out.push('l'),
            // Nordic
            'Ø' => out.push('O'),
            'ø' => out.push('o'),
            'Æ' => out.push_str("AE"),
            'æ' => out.push_str("ae"),
            // French
            'Œ' => out.push_str("OE"),
            'œ' => out.push_str("oe"),
            // German
            'ß' => out.push_str("ss"),
            // Icelandic
            'Ð' => out.push('D'),
            'ð' => out.push('d'),
            'Þ' => out.push_str("TH"),
            'þ' => out.push_str("th"),
            // Croatian/Serbian
            'Đ' => out.push('D'),
            'đ' => out.push('d'),
            // Curly quotes and modifier apostrophes
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{02BC}' | '\u{2032}' => {
                out.push('\'');
            }
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{00AB}' | '\u{00BB}' => {
                out.push('"');
            }
            // Hyphens and dashes
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            _ => out.push(c),
        }
    }
    out
}

/// Normalized stopword set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    /// Build a stopword set, normalizing every entry with [`exact_key`].
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| exact_key(w.as_ref()))
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for Stopwords {
    fn default() -> Self {
        Self::new(DEFAULT_STOPWORDS)
    }
}

/// Token-mode normalizer: stopword list plus minimum token length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenNormalizer {
    stopwords: Stopwords,
    min_token_len: usize,
}

impl Default for TokenNormalizer {
    fn default() -> Self {
        Self::new(Stopwords::default(), DEFAULT_MIN_TOKEN_LEN)
    }
}

impl TokenNormalizer {
    #[must_use]
    pub const fn new(stopwords: Stopwords, min_token_len: usize) -> Self {
        Self {
            stopwords,
            min_token_len,
        }
    }

    #[must_use]
    pub const fn stopwords(&self) -> &Stopwords {
        &self.stopwords
    }

    /// Token set of raw text.
    #[must_use]
    pub fn tokens(&self, text: &str) -> BTreeSet<String> {
        self.tokens_from_key(&exact_key(text))
    }

    /// Token set of text that is already in exact-key form.
    #[must_use]
    pub fn tokens_from_key(&self, key: &str) -> BTreeSet<String> {
        key.split(|c: char| c.is_whitespace() || c == '-' || c == ':')
            .filter(|t| !t.is_empty())
            .filter(|t| t.chars().count() >= self.min_token_len)
            .filter(|t| !self.stopwords.contains(t))
            .map(str::to_string)
            .collect()
    }
}
