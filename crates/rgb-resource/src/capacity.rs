//! Capacity strategies.
//!
//! Every slot has a base capacity fixed at construction. A
//! [`CapacityPolicy`] turns it into the effective capacity for a specific
//! resource, e.g. clamping item slots to the item's stack size.

use std::{fmt, rc::Rc};

use crate::{
    registry::ItemRegistry,
    resource::{Item, Resource},
};

/// Computes a slot's effective capacity for a resource.
pub trait CapacityPolicy<R: Resource>: fmt::Debug {
    /// Effective capacity of a slot with base capacity `base` holding `resource`.
    fn capacity_for(&self, base: u64, resource: &R) -> u64;
}

/// The base capacity applies to every resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Fixed;

impl<R: Resource> CapacityPolicy<R> for Fixed {
    fn capacity_for(&self, base: u64, _resource: &R) -> u64 {
        base
    }
}

/// Item capacity limited by the item's maximum stack size.
#[derive(Clone, Debug)]
pub struct StackLimited {
    registry: Rc<ItemRegistry>,
}

impl StackLimited {
    /// Create a policy backed by `registry`.
    #[must_use]
    pub const fn new(registry: Rc<ItemRegistry>) -> Self {
        Self { registry }
    }
}

impl CapacityPolicy<Item> for StackLimited {
    fn capacity_for(&self, base: u64, resource: &Item) -> u64 {
        base.min(self.registry.max_stack_size(resource))
    }
}
