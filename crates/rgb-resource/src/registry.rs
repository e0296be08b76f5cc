//! Item properties registry.
//!
//! Stack sizes are looked up in an explicitly constructed [`ItemRegistry`]
//! that is passed to capacity policies at construction time. Nothing here is
//! process-wide, so every test can build its own registry.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ResourceError, ResourceResult},
    resource::Item,
};

/// Stack size of items the registry knows nothing about.
pub const DEFAULT_MAX_STACK_SIZE: u64 = 64;

/// Static properties of an item type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemProperties {
    /// Largest amount of this item a single stack may hold.
    pub max_stack_size: u64,
}

impl Default for ItemProperties {
    fn default() -> Self {
        Self {
            max_stack_size: DEFAULT_MAX_STACK_SIZE,
        }
    }
}

/// Registry mapping items to their properties.
#[derive(Clone, Debug, Default)]
pub struct ItemRegistry {
    entries: FxHashMap<Item, ItemProperties>,
}

impl ItemRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an item.
    ///
    /// Registering the same item twice, or an item with a zero stack size, is
    /// a configuration error.
    pub fn register(&mut self, item: Item, properties: ItemProperties) -> ResourceResult<()> {
        if properties.max_stack_size == 0 {
            return Err(ResourceError::ZeroCapacity);
        }
        if self.entries.contains_key(&item) {
            return Err(ResourceError::DuplicateItem(item));
        }

        self.entries.insert(item, properties);
        Ok(())
    }

    /// Builder-style registration with just a stack size.
    pub fn with_item(mut self, item: Item, max_stack_size: u64) -> ResourceResult<Self> {
        self.register(item, ItemProperties { max_stack_size })?;
        Ok(self)
    }

    /// Properties of `item`, or the defaults if it was never registered.
    #[must_use]
    pub fn properties(&self, item: &Item) -> ItemProperties {
        self.entries.get(item).copied().unwrap_or_default()
    }

    /// Maximum stack size of `item`.
    #[must_use]
    pub fn max_stack_size(&self, item: &Item) -> u64 {
        self.properties(item).max_stack_size
    }

    /// Check if `item` was registered.
    #[must_use]
    pub fn contains(&self, item: &Item) -> bool {
        self.entries.contains_key(item)
    }

    /// Number of registered items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no items are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
