//! Country identity table: every accepted spelling of a country mapped to
//! one canonical display name and ISO code.
//!
//! The table is built once from a JSON reference document of the form
//!
//! ```json
//! { "countries": [ { "turkish": "Türkiye", "english": "Turkey",
//!                    "iso2": "TR", "aliases": ["Turkiye"] } ] }
//! ```
//!
//! and is immutable afterwards. Lookups go through [`exact_key`], so case,
//! diacritics, and punctuation differences resolve to the same entry. When two
//! entries claim the same spelling, the first one wins and the collision is
//! logged and kept in [`CountryIdentityTable::collisions`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::normalize::exact_key;

/// One entry of the reference document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryDefinition {
    /// Canonical display name.
    #[serde(alias = "name")]
    pub turkish: String,
    #[serde(default)]
    pub english: Option<String>,
    #[serde(default)]
    pub iso2: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CountryDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>, iso2: Option<&str>) -> Self {
        Self {
            turkish: name.into(),
            english: None,
            iso2: iso2.map(str::to_string),
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_english(mut self, english: impl Into<String>) -> Self {
        self.english = Some(english.into());
        self
    }

    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    fn spellings(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.turkish.as_str())
            .chain(self.english.as_deref())
            .chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceDocument {
    countries: Vec<CountryDefinition>,
}

/// The resolved identity of a country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryIdentity {
    pub name: String,
    /// Uppercased ISO code, when the reference defines one.
    pub code: Option<String>,
}

/// A spelling claimed by more than one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasCollision {
    pub spelling: String,
    pub kept: String,
    pub ignored: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("{}: country identity table not found at {}", ErrorCode::IdentityTableNotFound.code(), .path.display())]
    NotFound { path: PathBuf },

    #[error("{}: failed to read {}: {source}", ErrorCode::IdentityTableNotFound.code(), .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: failed to parse {}: {source}", ErrorCode::IdentityTableParseError.code(), .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl IdentityError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } | Self::Io { .. } => ErrorCode::IdentityTableNotFound,
            Self::Parse { .. } => ErrorCode::IdentityTableParseError,
        }
    }
}

/// Immutable spelling → identity lookup.
#[derive(Debug, Clone, Default)]
pub struct CountryIdentityTable {
    identities: Vec<CountryIdentity>,
    /// Exact-key spelling → index into `identities`.
    by_key: HashMap<String, usize>,
    /// Canonical display name → index into `identities`.
    by_name: HashMap<String, usize>,
    collisions: Vec<AliasCollision>,
}

impl CountryIdentityTable {
    /// Build a table from definitions in reference order.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = CountryDefinition>) -> Self {
        let mut table = Self::default();
        for def in definitions {
            table.insert(def);
        }
        table
    }

    /// Parse the JSON reference document.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the text is not a reference document.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        let doc: ReferenceDocument = serde_json::from_str(text)?;
        Ok(Self::from_definitions(doc.countries))
    }

    /// Load the reference document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the file is missing, unreadable, or not
    /// a valid reference document.
    pub fn load(path: &Path) -> Result<Self, IdentityError> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                IdentityError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                IdentityError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let table = Self::from_json_str(&text).map_err(|source| IdentityError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            path = %path.display(),
            countries = table.len(),
            spellings = table.by_key.len(),
            "loaded country identity table"
        );
        Ok(table)
    }

    fn insert(&mut self, def: CountryDefinition) {
        let name = def.turkish.trim().to_string();
        if exact_key(&name).is_empty() {
            warn!(?def, "ignoring country entry with an empty name");
            return;
        }

        let code = def
            .iso2
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase);

        let index = self.identities.len();
        self.identities.push(CountryIdentity {
            name: name.clone(),
            code,
        });
        self.by_name.entry(name.clone()).or_insert(index);

        for spelling in def.spellings() {
            let key = exact_key(spelling);
            if key.is_empty() {
                continue;
            }
            match self.by_key.get(&key) {
                None => {
                    self.by_key.insert(key, index);
                }
                Some(&existing) if existing == index => {}
                Some(&existing) => {
                    let kept = self.identities[existing].name.clone();
                    warn!(
                        spelling,
                        kept = %kept,
                        ignored = %name,
                        "country alias collision, keeping first entry"
                    );
                    self.collisions.push(AliasCollision {
                        spelling: spelling.to_string(),
                        kept,
                        ignored: name.clone(),
                    });
                }
            }
        }
    }

    /// Resolve any accepted spelling to its identity.
    ///
    /// ```
    /// use chronicle_core::identity::{CountryDefinition, CountryIdentityTable};
    ///
    /// let table = CountryIdentityTable::from_definitions([
    ///     CountryDefinition::new("Türkiye", Some("tr")).with_english("Turkey"),
    /// ]);
    /// let id = table.lookup("TURKIYE").unwrap();
    /// assert_eq!(id.name, "Türkiye");
    /// assert_eq!(id.code.as_deref(), Some("TR"));
    /// assert!(table.lookup("Narnia").is_none());
    /// ```
    #[must_use]
    pub fn lookup(&self, spelling: &str) -> Option<&CountryIdentity> {
        self.lookup_key(&exact_key(spelling))
    }

    /// Resolve a spelling already in exact-key form.
    #[must_use]
    pub fn lookup_key(&self, key: &str) -> Option<&CountryIdentity> {
        self.by_key.get(key).map(|&i| &self.identities[i])
    }

    /// True when `name` is byte-for-byte a canonical display name.
    #[must_use]
    pub fn is_canonical(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Identity whose canonical display name is exactly `name`.
    #[must_use]
    pub fn by_canonical_name(&self, name: &str) -> Option<&CountryIdentity> {
        self.by_name.get(name).map(|&i| &self.identities[i])
    }

    #[must_use]
    pub fn collisions(&self) -> &[AliasCollision] {
        &self.collisions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
