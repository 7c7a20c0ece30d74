use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An optional catalog field that remembers whether it was absent or `null`.
///
/// Producers disagree on whether an empty field is written as `null` or left
/// out entirely. Keeping the distinction lets a record round-trip byte-for-byte
/// when the engine has nothing to change. Use with
/// `#[serde(default, skip_serializing_if = "Slot::is_absent")]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<T> Slot<T> {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub const fn get(&self) -> Option<&T> {
        match self {
            Self::Value(v) => Some(v),
            Self::Absent | Self::Null => None,
        }
    }

    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn set(&mut self, value: T) {
        *self = Self::Value(value);
    }
}

impl Slot<String> {
    /// The trimmed value, or `None` when absent, null, or blank.
    #[must_use]
    pub fn non_empty(&self) -> Option<&str> {
        self.get().map(|s| s.trim()).filter(|s| !s.is_empty())
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Slot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}

impl<T: Serialize> Serialize for Slot<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => v.serialize(serializer),
            Self::Absent | Self::Null => serializer.serialize_none(),
        }
    }
}
