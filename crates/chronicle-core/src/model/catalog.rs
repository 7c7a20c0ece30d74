use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use super::event::EventRecord;

const EVENTS_KEY: &str = "events";
const CATEGORIES_KEY: &str = "categories";

/// Structural problems with the catalog document as a whole.
#[derive(Debug, thiserror::Error)]
pub enum CatalogShapeError {
    #[error("catalog root must be a JSON object, found {0}")]
    RootNotObject(&'static str),

    #[error("`events` must be an array, found {0}")]
    EventsNotArray(&'static str),

    #[error("`categories` must be an object, found {0}")]
    CategoriesNotObject(&'static str),
}

/// An entry the engine could not read as an [`EventRecord`].
///
/// It is carried through every stage untouched and written back in place.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedEntry {
    pub raw: Value,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEntry {
    Event(EventRecord),
    Malformed(MalformedEntry),
}

impl CatalogEntry {
    #[must_use]
    pub const fn as_event(&self) -> Option<&EventRecord> {
        match self {
            Self::Event(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }

    pub const fn as_event_mut(&mut self) -> Option<&mut EventRecord> {
        match self {
            Self::Event(e) => Some(e),
            Self::Malformed(_) => None,
        }
    }

    fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Self::Event(e) => e.to_object().map(Value::Object),
            Self::Malformed(m) => Ok(m.raw.clone()),
        }
    }
}

/// The whole catalog: category table, ordered entries, and any other
/// top-level keys, kept in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    /// Top-level object with the `events` array taken out.
    root: Map<String, Value>,
    pub entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Build a catalog from already-classified entries and a category table.
    #[must_use]
    pub fn new(categories: Map<String, Value>, entries: Vec<CatalogEntry>) -> Self {
        let mut root = Map::new();
        root.insert(CATEGORIES_KEY.to_string(), Value::Object(categories));
        root.insert(EVENTS_KEY.to_string(), Value::Null);
        Self { root, entries }
    }

    /// Classify every element of the `events` array.
    ///
    /// Entries that are not objects, fail to deserialize, have an empty
    /// id/title/country, or reuse an id already seen are kept as
    /// [`CatalogEntry::Malformed`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogShapeError`] when the document itself has the wrong
    /// shape. Individual bad entries never cause an error.
    pub fn from_value(value: Value) -> Result<Self, CatalogShapeError> {
        let Value::Object(mut root) = value else {
            return Err(CatalogShapeError::RootNotObject(type_name(&value)));
        };

        if let Some(categories) = root.get(CATEGORIES_KEY).filter(|c| !c.is_object()) {
            return Err(CatalogShapeError::CategoriesNotObject(type_name(categories)));
        }

        let raw_events = match root.get_mut(EVENTS_KEY) {
            None => Vec::new(),
            Some(slot) => match std::mem::take(slot) {
                Value::Array(items) => items,
                other => return Err(CatalogShapeError::EventsNotArray(type_name(&other))),
            },
        };
        root.insert(EVENTS_KEY.to_string(), Value::Null);

        let mut first_seen: HashMap<String, usize> = HashMap::new();
        let entries = raw_events
            .into_iter()
            .enumerate()
            .map(|(index, raw)| classify(index, raw, &mut first_seen))
            .collect();

        Ok(Self { root, entries })
    }

    /// Serialize back into a document with the original top-level key order.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors (not expected for well-formed records).
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let events = self
            .entries
            .iter()
            .map(CatalogEntry::to_value)
            .collect::<serde_json::Result<Vec<_>>>()?;
        let mut root = self.root.clone();
        root.insert(EVENTS_KEY.to_string(), Value::Array(events));
        Ok(Value::Object(root))
    }

    /// The category-definition table (empty when the document has none).
    #[must_use]
    pub fn categories(&self) -> Option<&Map<String, Value>> {
        self.root.get(CATEGORIES_KEY).and_then(Value::as_object)
    }

    #[must_use]
    pub fn has_category(&self, key: &str) -> bool {
        self.categories().is_some_and(|c| c.contains_key(key))
    }

    /// Well-formed events with their catalog index.
    pub fn events(&self) -> impl Iterator<Item = (usize, &EventRecord)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.as_event().map(|ev| (i, ev)))
    }

    /// Malformed entries with their catalog index.
    pub fn malformed(&self) -> impl Iterator<Item = (usize, &MalformedEntry)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| match e {
            CatalogEntry::Malformed(m) => Some((i, m)),
            CatalogEntry::Event(_) => None,
        })
    }

    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events().count()
    }
}

fn classify(index: usize, raw: Value, first_seen: &mut HashMap<String, usize>) -> CatalogEntry {
    let Some(object) = raw.as_object().cloned() else {
        let reason = format!("entry is {}, not an object", type_name(&raw));
        return malformed(index, raw, reason);
    };

    let record = match EventRecord::from_object(object) {
        Ok(record) => record,
        Err(err) => return malformed(index, raw, err.to_string()),
    };

    if let Some(defect) = record.structural_defect() {
        return malformed(index, raw, defect.to_string());
    }

    if let Some(first) = first_seen.get(&record.id) {
        let reason = format!("duplicate id `{}` (first seen at index {first})", record.id);
        return malformed(index, raw, reason);
    }
    first_seen.insert(record.id.clone(), index);

    CatalogEntry::Event(record)
}

fn malformed(index: usize, raw: Value, reason: String) -> CatalogEntry {
    warn!(index, %reason, "skipping malformed catalog entry");
    CatalogEntry::Malformed(MalformedEntry { raw, reason })
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
