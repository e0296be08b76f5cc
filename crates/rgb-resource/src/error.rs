//! Resource error types.

use thiserror::Error;

use crate::{resource::Item, role::GroupRole};

/// Resource error type.
///
/// Only construction, configuration and persistence problems are errors.
/// A slot refusing a resource (wrong filter, wrong contents, no space) is an
/// expected outcome and is reported by returning `0`.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Identifier is not a valid `namespace:path`.
    #[error("malformed identifier `{0}`")]
    MalformedIdentifier(String),

    /// A slot was configured with zero capacity.
    #[error("slot capacity must be positive")]
    ZeroCapacity,

    /// A slot group was built without slots.
    #[error("slot group `{0}` has no slots")]
    EmptyGroup(GroupRole),

    /// Two slot groups were registered under the same role.
    #[error("slot group `{0}` is registered twice")]
    DuplicateGroup(GroupRole),

    /// An item was registered twice.
    #[error("item {0:?} is registered twice")]
    DuplicateItem(Item),

    /// Contents exceed the slot's capacity for that resource.
    #[error("amount {amount} exceeds capacity {capacity}")]
    OverCapacity {
        /// Requested amount.
        amount: u64,
        /// Capacity for the resource.
        capacity: u64,
    },

    /// Contents are rejected by the slot's filter.
    #[error("resource rejected by slot filter")]
    Filtered,

    /// A filled record carries no amount.
    #[error("filled record has zero amount")]
    ZeroAmount,

    /// A storage record does not match the storage's shape.
    #[error("record has {found} slots, storage has {expected}")]
    SlotCountMismatch {
        /// Slots in the storage.
        expected: usize,
        /// Slots in the record.
        found: usize,
    },

    /// A single slot record could not be loaded.
    #[error("slot {index}: {source}")]
    InvalidRecord {
        /// Global index of the slot.
        index: usize,
        /// Why the record was rejected.
        source: Box<ResourceError>,
    },

    /// Binary encoding error.
    #[error("encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// JSON layout error.
    #[error("layout error: {0}")]
    Layout(#[from] serde_json::Error),
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
