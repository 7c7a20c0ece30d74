use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;
use crate::normalize::{DEFAULT_MIN_TOKEN_LEN, DEFAULT_STOPWORDS, Stopwords, TokenNormalizer};
use crate::validate::ValidationOptions;

/// File name looked up next to the catalog when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "chronicle.toml";

/// Default rule order of the duplicate cascade.
pub const DEFAULT_RULES: &[&str] = &[
    "shared_external_link",
    "exact_title_key",
    "near_identical_title",
    "category_mismatch",
    "fuzzy_title",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChronicleConfig {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub persist: PersistConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Ordered rule names; the first rule that decides wins.
    #[serde(default = "default_rules")]
    pub rules: Vec<String>,
    #[serde(default = "default_near_identical_ratio")]
    pub near_identical_ratio: f64,
    #[serde(default = "default_char_ratio")]
    pub char_ratio: f64,
    #[serde(default = "default_token_ratio")]
    pub token_ratio: f64,
    #[serde(default = "default_exact_token_char_ratio")]
    pub exact_token_char_ratio: f64,
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    /// Replaces the built-in stopword list when set.
    #[serde(default)]
    pub stopwords: Option<Vec<String>>,
    #[serde(default)]
    pub extra_stopwords: Vec<String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            near_identical_ratio: default_near_identical_ratio(),
            char_ratio: default_char_ratio(),
            token_ratio: default_token_ratio(),
            exact_token_char_ratio: default_exact_token_char_ratio(),
            min_token_len: default_min_token_len(),
            stopwords: None,
            extra_stopwords: Vec::new(),
        }
    }
}

impl MatchingConfig {
    /// Token normalizer built from the stopword settings.
    #[must_use]
    pub fn token_normalizer(&self) -> TokenNormalizer {
        let base: Vec<&str> = self.stopwords.as_ref().map_or_else(
            || DEFAULT_STOPWORDS.to_vec(),
            |words| words.iter().map(String::as_str).collect(),
        );
        let words = base
            .into_iter()
            .chain(self.extra_stopwords.iter().map(String::as_str));
        TokenNormalizer::new(Stopwords::new(words), self.min_token_len)
    }
}

/// Floors for pairs listed by the near-miss review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    #[serde(default = "default_review_char_ratio")]
    pub char_ratio: f64,
    #[serde(default = "default_review_token_ratio")]
    pub token_ratio: f64,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            char_ratio: default_review_char_ratio(),
            token_ratio: default_review_token_ratio(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    #[serde(default)]
    pub allow_unknown_countries: bool,
}

impl ValidationConfig {
    #[must_use]
    pub const fn options(&self) -> ValidationOptions {
        ValidationOptions {
            allow_unknown_countries: self.allow_unknown_countries,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistConfig {
    /// Copy the previous catalog to a timestamped backup before overwriting.
    #[serde(default = "default_true")]
    pub backup: bool,
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            backup: default_true(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{}: config file not found at {}", ErrorCode::ConfigParseError.code(), .path.display())]
    NotFound { path: PathBuf },

    #[error("{}: failed to read {}: {source}", ErrorCode::ConfigParseError.code(), .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: failed to parse {}: {source}", ErrorCode::ConfigParseError.code(), .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::ConfigParseError
    }
}

/// Resolve which config file applies: an explicit path, else
/// `chronicle.toml` beside the catalog when it exists.
#[must_use]
pub fn config_path(explicit: Option<&Path>, catalog: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let sibling = catalog
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(CONFIG_FILE_NAME);
    sibling.exists().then_some(sibling)
}

/// Load configuration, falling back to defaults when no file applies.
///
/// # Errors
///
/// Returns [`ConfigError`] when an explicitly named file is missing or any
/// applicable file cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>, catalog: &Path) -> Result<ChronicleConfig, ConfigError> {
    let Some(path) = config_path(explicit, catalog) else {
        return Ok(ChronicleConfig::default());
    };

    let content = std::fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound { path: path.clone() }
        } else {
            ConfigError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;

    let config = toml::from_str::<ChronicleConfig>(&content)
        .map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

const fn default_true() -> bool {
    true
}

fn default_rules() -> Vec<String> {
    DEFAULT_RULES.iter().map(|r| (*r).to_string()).collect()
}

const fn default_near_identical_ratio() -> f64 {
    0.97
}

const fn default_char_ratio() -> f64 {
    0.90
}

const fn default_token_ratio() -> f64 {
    0.90
}

const fn default_exact_token_char_ratio() -> f64 {
    0.88
}

const fn default_min_token_len() -> usize {
    DEFAULT_MIN_TOKEN_LEN
}

const fn default_review_char_ratio() -> f64 {
    0.75
}

const fn default_review_token_ratio() -> f64 {
    0.5
}

const fn default_lock_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(None, &dir.path().join("events.json")).unwrap();
        assert_eq!(cfg, ChronicleConfig::default());
        assert_eq!(cfg.matching.rules.len(), 5);
        assert!((cfg.matching.near_identical_ratio - 0.97).abs() < f64::EPSILON);
        assert!(cfg.persist.backup);
        assert!(!cfg.validation.allow_unknown_countries);
    }

    #[test]
    fn sibling_config_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[matching]
char_ratio = 0.85
extra_stopwords = ["olaylari"]

[validation]
allow_unknown_countries = true

[persist]
backup = false
"#,
        )
        .unwrap();

        let cfg = load_config(None, &dir.path().join("events.json")).unwrap();
        assert!((cfg.matching.char_ratio - 0.85).abs() < f64::EPSILON);
        assert!((cfg.matching.token_ratio - 0.90).abs() < f64::EPSILON);
        assert!(cfg.validation.allow_unknown_countries);
        assert!(!cfg.persist.backup);
        assert_eq!(cfg.persist.lock_timeout_ms, 5_000);

        let tokens = cfg.matching.token_normalizer().tokens("Olayları ve Savaşı");
        assert!(tokens.is_empty());
    }

    #[test]
    fn stopwords_replace_defaults() {
        let cfg: ChronicleConfig = toml::from_str(
            r#"
[matching]
stopwords = ["lambs"]
min_token_len = 2
"#,
        )
        .unwrap();
        let tokens = cfg.matching.token_normalizer().tokens("The Silence of the Lambs");
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        assert_eq!(tokens, ["of", "silence", "the"]);
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml")), &dir.path().join("e.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[matching]\nchar_ratoi = 0.5\n").unwrap();
        let err = load_config(Some(&path), &dir.path().join("e.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("E1201"));
    }
}
