//! Loading and persisting the catalog file.
//!
//! Writes go through a temp file in the same directory followed by a rename,
//! so an interrupted run leaves the previous catalog intact. Callers that
//! write hold a [`CatalogLock`](crate::lock::CatalogLock) for the whole
//! read-modify-write cycle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::ErrorCode;
use crate::model::{Catalog, CatalogShapeError};

/// `strftime` pattern of the backup suffix (`events.json.bak.20260101T120000Z`).
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{}: catalog not found at {}", ErrorCode::CatalogNotFound.code(), .path.display())]
    NotFound { path: PathBuf },

    #[error("{}: failed to read {}: {source}", ErrorCode::CatalogNotFound.code(), .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: failed to parse {}: {source}", ErrorCode::CatalogParseError.code(), .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {}: {source}", ErrorCode::CatalogShapeInvalid.code(), .path.display())]
    Shape {
        path: PathBuf,
        #[source]
        source: CatalogShapeError,
    },

    #[error("{}: failed to serialize catalog: {0}", ErrorCode::InternalUnexpected.code())]
    Serialize(#[source] serde_json::Error),

    #[error("{}: failed to write {}: {source}", ErrorCode::CatalogWriteFailed.code(), .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } | Self::Read { .. } => ErrorCode::CatalogNotFound,
            Self::Parse { .. } => ErrorCode::CatalogParseError,
            Self::Shape { .. } => ErrorCode::CatalogShapeInvalid,
            Self::Serialize(_) => ErrorCode::InternalUnexpected,
            Self::Write { .. } => ErrorCode::CatalogWriteFailed,
        }
    }
}

/// Read and classify the catalog at `path`.
///
/// # Errors
///
/// Returns [`StoreError`] when the file is missing, unreadable, not JSON, or
/// not shaped like a catalog.
pub fn load_catalog(path: &Path) -> Result<Catalog, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value = serde_json::from_str(&text).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Catalog::from_value(value).map_err(|source| StoreError::Shape {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize the catalog as two-space indented JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`StoreError::Serialize`] if a record cannot be serialized.
pub fn render_catalog(catalog: &Catalog) -> Result<String, StoreError> {
    let value = catalog.to_value().map_err(StoreError::Serialize)?;
    let mut text = serde_json::to_string_pretty(&value).map_err(StoreError::Serialize)?;
    text.push('\n');
    Ok(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistOptions {
    pub backup: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOutcome {
    pub path: PathBuf,
    pub backup: Option<PathBuf>,
    pub bytes: usize,
}

/// Atomically replace the catalog at `path`.
///
/// # Errors
///
/// Returns [`StoreError`] when serialization, the backup copy, the temp
/// write, or the rename fails. The previous file is untouched in every case.
pub fn persist_catalog(
    path: &Path,
    catalog: &Catalog,
    options: PersistOptions,
) -> Result<PersistOutcome, StoreError> {
    let text = render_catalog(catalog)?;

    let backup = if options.backup && path.exists() {
        let backup = backup_path(path, Utc::now());
        fs::copy(path, &backup).map_err(|source| StoreError::Write {
            path: backup.clone(),
            source,
        })?;
        Some(backup)
    } else {
        None
    };

    let tmp = sibling_with_suffix(path, "tmp");
    fs::write(&tmp, text.as_bytes()).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    if let Err(source) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    info!(
        path = %path.display(),
        bytes = text.len(),
        backup = backup.as_ref().map(|b| b.display().to_string()),
        "persisted catalog"
    );

    Ok(PersistOutcome {
        path: path.to_path_buf(),
        backup,
        bytes: text.len(),
    })
}

/// Backup path for `path` taken at `at`.
#[must_use]
pub fn backup_path(path: &Path, at: DateTime<Utc>) -> PathBuf {
    let stamp = at.format(BACKUP_TIMESTAMP_FORMAT).to_string();
    sibling_with_suffix(path, &format!("bak.{stamp}"))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RAW: &str = r##"{
  "categories": {
    "war": {
      "label": "Savaş",
      "color": "#c0392b"
    }
  },
  "events": [
    {
      "id": "ev1",
      "country_name": "Fransa",
      "lat": 48.85,
      "lon": 2.35,
      "year": 1937,
      "category": "war",
      "title": "İspanya İç Savaşı",
      "source": "manual"
    },
    {
      "country_name": "Almanya",
      "year": 1989,
      "category": "war",
      "title": "Berlin Duvarı",
      "id": "ev2"
    },
    42
  ],
  "version": 2
}
"##;

    #[test]
    fn untouched_catalog_round_trips_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, RAW).unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(render_catalog(&catalog).unwrap(), RAW);
    }

    #[test]
    fn persist_writes_backup_and_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, RAW).unwrap();

        let mut catalog = load_catalog(&path).unwrap();
        catalog.entries.pop();
        let outcome = persist_catalog(&path, &catalog, PersistOptions { backup: true }).unwrap();

        let backup = outcome.backup.unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), RAW);
        assert!(
            backup
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("events.json.bak.")
        );

        let reloaded = load_catalog(&path).unwrap();
        assert_eq!(reloaded.entries.len(), 1);
        assert!(!sibling_with_suffix(&path, "tmp").exists());
    }

    #[test]
    fn persist_without_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.json");
        fs::write(&path, RAW).unwrap();
        let catalog = load_catalog(&path).unwrap();
        let outcome = persist_catalog(&path, &catalog, PersistOptions { backup: false }).unwrap();
        assert!(outcome.backup.is_none());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn backup_name_uses_utc_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            backup_path(Path::new("data/events.json"), at),
            PathBuf::from("data/events.json.bak.20260309T070501Z")
        );
    }

    #[test]
    fn load_errors_carry_codes() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_catalog(&dir.path().join("none.json")).unwrap_err();
        assert_eq!(missing.code(), ErrorCode::CatalogNotFound);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        assert_eq!(load_catalog(&bad).unwrap_err().code(), ErrorCode::CatalogParseError);

        let shape = dir.path().join("shape.json");
        fs::write(&shape, r#"{"events": 3}"#).unwrap();
        let err = load_catalog(&shape).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CatalogShapeInvalid);
        assert!(err.to_string().starts_with("E1003"));
    }
}
