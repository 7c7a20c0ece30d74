use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::slot::Slot;

/// Suffix appended to the decade start year (`1980` → `1980s`).
pub const DECADE_SUFFIX: &str = "s";

/// Decade label derived from a year: `floor(year / 10) * 10` plus suffix.
///
/// ```
/// use chronicle_core::model::decade_for_year;
///
/// assert_eq!(decade_for_year(1987), "1980s");
/// assert_eq!(decade_for_year(2000), "2000s");
/// assert_eq!(decade_for_year(-5), "-10s");
/// ```
#[must_use]
pub fn decade_for_year(year: i64) -> String {
    format!("{}{DECADE_SUFFIX}", year.div_euclid(10) * 10)
}

/// A latitude/longitude pair. `(0, 0)` means "unset".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }
}

/// Pre-`youtube_video_id` spellings of the video field.
const LEGACY_MEDIA_FIELDS: [&str; 2] = ["youtube_url", "youtube"];

/// Key order of the object a record was read from.
///
/// Presentation only: it never makes two records unequal.
#[derive(Debug, Clone, Default)]
pub struct KeyLayout(Vec<String>);

impl KeyLayout {
    fn of(object: &Map<String, Value>) -> Self {
        Self(object.keys().cloned().collect())
    }

    /// Original position of `key`; keys the source did not have sort last.
    fn rank(&self, key: &str) -> usize {
        self.0.iter().position(|k| k == key).unwrap_or(usize::MAX)
    }
}

impl PartialEq for KeyLayout {
    fn eq(&self, _: &Self) -> bool {
        true
    }
}

/// One catalog entry describing a historical event.
///
/// Fields this type does not name are kept in [`EventRecord::extra`]. Read
/// with [`EventRecord::from_object`] and written with
/// [`EventRecord::to_object`], a record keeps the key order of its source
/// object; keys it gains during a merge are appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub country_code: Slot<String>,
    pub country_name: String,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub lat: Slot<Number>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub lon: Slot<Number>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub decade: Slot<String>,
    pub year: i64,
    pub category: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub description: Slot<String>,
    /// Encyclopedia link.
    #[serde(
        rename = "wikipedia_url",
        default,
        skip_serializing_if = "Slot::is_absent"
    )]
    pub external_link: Slot<String>,
    /// Video identifier.
    #[serde(
        rename = "youtube_video_id",
        default,
        skip_serializing_if = "Slot::is_absent"
    )]
    pub media_link: Slot<String>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub casualties: Slot<Number>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub key_figures: Slot<Vec<String>>,
    #[serde(default, skip_serializing_if = "Slot::is_absent")]
    pub tags: Slot<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(skip)]
    pub layout: KeyLayout,
}

impl EventRecord {
    /// Minimal record, mostly for producers and tests.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        country_name: impl Into<String>,
        year: i64,
        category: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            country_code: Slot::Absent,
            country_name: country_name.into(),
            lat: Slot::Absent,
            lon: Slot::Absent,
            decade: Slot::Value(decade_for_year(year)),
            year,
            category: category.into(),
            title: title.into(),
            description: Slot::Absent,
            external_link: Slot::Absent,
            media_link: Slot::Absent,
            casualties: Slot::Absent,
            key_figures: Slot::Absent,
            tags: Slot::Absent,
            extra: Map::new(),
            layout: KeyLayout::default(),
        }
    }

    /// Deserialize from a catalog object, remembering its key order.
    ///
    /// # Errors
    ///
    /// Returns the serde error when a required field is missing or mistyped.
    pub fn from_object(object: Map<String, Value>) -> serde_json::Result<Self> {
        let layout = KeyLayout::of(&object);
        let mut record: Self = serde_json::from_value(Value::Object(object))?;
        record.layout = layout;
        Ok(record)
    }

    /// Serialize into a catalog object in source key order.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors (not expected for well-formed records).
    pub fn to_object(&self) -> serde_json::Result<Map<String, Value>> {
        let Value::Object(fields) = serde_json::to_value(self)? else {
            return Err(serde::ser::Error::custom(
                "event record did not serialize to an object",
            ));
        };
        let mut entries: Vec<(String, Value)> = fields.into_iter().collect();
        entries.sort_by_key(|(key, _)| self.layout.rank(key));
        Ok(entries.into_iter().collect())
    }

    /// Coordinates when both components are present and numeric.
    #[must_use]
    pub fn coordinates(&self) -> Option<Coordinates> {
        let lat = self.lat.get()?.as_f64()?;
        let lon = self.lon.get()?.as_f64()?;
        Some(Coordinates { lat, lon })
    }

    /// True when the record carries a real location.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.coordinates().is_some_and(|c| !c.is_unset())
    }

    #[must_use]
    pub fn has_external_link(&self) -> bool {
        self.external_link.non_empty().is_some()
    }

    /// Video id, or one of the older `youtube_url` / `youtube` fields.
    #[must_use]
    pub fn has_media_link(&self) -> bool {
        self.media_link.non_empty().is_some()
            || LEGACY_MEDIA_FIELDS.iter().any(|key| {
                self.extra
                    .get(*key)
                    .and_then(Value::as_str)
                    .is_some_and(|s| !s.trim().is_empty())
            })
    }

    #[must_use]
    pub const fn has_casualties(&self) -> bool {
        self.casualties.is_set()
    }

    /// Trimmed description, empty when absent.
    #[must_use]
    pub fn description_text(&self) -> &str {
        self.description.get().map_or("", |d| d.trim())
    }

    /// Description length in characters, ignoring surrounding whitespace.
    #[must_use]
    pub fn description_len(&self) -> usize {
        self.description_text().chars().count()
    }

    #[must_use]
    pub fn key_figures(&self) -> &[String] {
        self.key_figures.get().map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn expected_decade(&self) -> String {
        decade_for_year(self.year)
    }

    /// Reason this record cannot take part in matching, if any.
    #[must_use]
    pub fn structural_defect(&self) -> Option<&'static str> {
        if self.id.trim().is_empty() {
            return Some("empty id");
        }
        if self.country_name.trim().is_empty() {
            return Some("empty country_name");
        }
        if self.title.trim().is_empty() {
            return Some("empty title");
        }
        None
    }
}
