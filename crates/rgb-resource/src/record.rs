//! Persistent records of slot contents.
//!
//! Records are plain serde data: `serde_json` for readable dumps and
//! `bincode` for the compact form a host stores next to its world data.

use serde::{Deserialize, Serialize};

use crate::{
    error::ResourceResult,
    resource::{Resource, ResourceStack},
};

/// Persistent form of one slot.
///
/// A blank slot is recorded as [`SlotRecord::Empty`], never as a filled
/// record with a zero amount.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound = "", rename_all = "snake_case")]
pub enum SlotRecord<R: Resource> {
    Empty,
    Filled {
        resource: R,
        tag: Option<R::Tag>,
        amount: u64,
    },
}

impl<R: Resource> SlotRecord<R> {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// The recorded stack, if any.
    #[must_use]
    pub fn to_stack(&self) -> Option<ResourceStack<R>> {
        match self {
            Self::Empty => None,
            Self::Filled {
                resource,
                tag,
                amount,
            } => Some(ResourceStack::new(resource.clone(), tag.clone(), *amount)),
        }
    }
}

impl<R: Resource> From<Option<ResourceStack<R>>> for SlotRecord<R> {
    fn from(contents: Option<ResourceStack<R>>) -> Self {
        match contents {
            None => Self::Empty,
            Some(stack) => Self::Filled {
                resource: stack.resource,
                tag: stack.tag,
                amount: stack.amount,
            },
        }
    }
}

/// Persistent form of a whole storage, one record per slot in global order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StorageRecord<R: Resource> {
    slots: Vec<SlotRecord<R>>,
}

impl<R: Resource> StorageRecord<R> {
    #[must_use]
    pub const fn new(slots: Vec<SlotRecord<R>>) -> Self {
        Self { slots }
    }

    #[must_use]
    pub fn slots(&self) -> &[SlotRecord<R>] {
        &self.slots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Encode with bincode.
    ///
    /// # Errors
    ///
    /// Propagates bincode failures.
    pub fn to_bytes(&self) -> ResourceResult<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode from [`to_bytes`](Self::to_bytes) output.
    ///
    /// # Errors
    ///
    /// Propagates bincode failures.
    pub fn from_bytes(bytes: &[u8]) -> ResourceResult<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl<R: Resource> FromIterator<SlotRecord<R>> for StorageRecord<R> {
    fn from_iter<I: IntoIterator<Item = SlotRecord<R>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        resource::{Energy, Item},
        tag::{Tag, TagValue},
    };

    #[test]
    fn test_empty_distinct_from_zero() {
        let empty = SlotRecord::<Energy>::Empty;
        let zero = SlotRecord::Filled {
            resource: Energy,
            tag: None,
            amount: 0,
        };
        assert_ne!(empty, zero);
        assert!(empty.is_empty());
        assert_eq!(serde_json::to_string(&empty).unwrap(), "\"empty\"");
    }

    #[test]
    fn test_storage_record_bytes() {
        let sword = Item::parse("diamond_sword").unwrap();
        let tag = Tag::new().with(
            "enchantments",
            TagValue::List(vec![TagValue::from("sharpness"), TagValue::Short(5)]),
        );
        let record: StorageRecord<Item> = [
            SlotRecord::Empty,
            SlotRecord::from(Some(ResourceStack::new(sword, Some(tag), 1))),
        ]
        .into_iter()
        .collect();

        let bytes = record.to_bytes().unwrap();
        assert_eq!(StorageRecord::from_bytes(&bytes).unwrap(), record);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_garbage_bytes_rejected() {
        assert!(StorageRecord::<Item>::from_bytes(&[0xff; 3]).is_err());
    }
}
