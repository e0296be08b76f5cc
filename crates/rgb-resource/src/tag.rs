//! Structured auxiliary payloads attached to resources.
//!
//! A [`Tag`] is an NBT-like compound: string keys mapping to [`TagValue`]s.
//! Keys are kept sorted so equality, hashing and serialization are
//! structural and stable. There are no floating point values, which keeps
//! `Eq` and `Hash` exact.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single tag value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    String(String),
    ByteArray(Vec<i8>),
    IntArray(Vec<i32>),
    List(Vec<TagValue>),
    Compound(Tag),
}

impl From<i8> for TagValue {
    fn from(value: i8) -> Self {
        Self::Byte(value)
    }
}

impl From<i16> for TagValue {
    fn from(value: i16) -> Self {
        Self::Short(value)
    }
}

impl From<i32> for TagValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for TagValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<&str> for TagValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for TagValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Tag> for TagValue {
    fn from(value: Tag) -> Self {
        Self::Compound(value)
    }
}

/// A compound tag.
///
/// An empty tag is a present value and is distinct from "no tag"
/// (`Option::<Tag>::None`) wherever tags are compared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(BTreeMap<String, TagValue>);

impl Tag {
    /// Create an empty compound.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<TagValue>) -> Option<TagValue> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a value.
    pub fn remove(&mut self, key: &str) -> Option<TagValue> {
        self.0.remove(key)
    }

    /// Get a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TagValue> {
        self.0.get(key)
    }

    /// Check if a key is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the compound has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<TagValue>> FromIterator<(K, V)> for Tag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}
