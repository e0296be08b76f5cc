#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::missing_fields_in_debug)]

//! RGB Resource - typed, capacity-bounded, filterable resource slots
//!
//! Machines store items, fluids and energy in slots. This crate provides the
//! slot engine shared by every resource kind:
//!
//! - **ResourceSlot**: one `(resource, tag, amount)` cell with a capacity,
//!   a filter and transactional mutation
//! - **SlotGroup**: an ordered, fixed-size run of slots sharing a role
//! - **ResourceStorage**: role-keyed groups plus flat slot indexing and one
//!   modification counter for the whole storage
//! - **ExposedStorage / ExposedSlot**: flow-restricted views handed to
//!   automation and players
//!
//! # Transactions
//!
//! Every mutating operation takes a [`Transaction`](rgb_transaction::Transaction)
//! and snapshots the slot before touching it, so a multi-slot move can be
//! rolled back as a whole:
//!
//! ```ignore
//! let mut tx = Transaction::open();
//! let moved = tank.extract(&water, None, BUCKET, &mut tx);
//! if boiler.insert(&water, None, moved, &mut tx) == moved {
//!     tx.commit();
//! }
//! ```
//!
//! Operations suffixed `_immediate` apply at once and cannot be rolled back.
//!
//! # Modification Counting
//!
//! Each committed change increments the slot's counter, which propagates to
//! its group and storage. Sync code polls [`ResourceStorage::version`] and
//! only re-reads contents when it moved.

mod capacity;
mod display;
mod error;
mod exposed;
mod filter;
mod flow;
mod group;
mod identifier;
mod layout;
mod mod_count;
mod record;
mod registry;
mod resource;
mod role;
mod slot;
mod storage;
mod tag;

pub use capacity::{CapacityPolicy, Fixed, StackLimited};
pub use display::SlotDisplay;
pub use error::{ResourceError, ResourceResult};
pub use exposed::{ExposedSlot, ExposedStorage, SlotCursor};
pub use filter::ResourceFilter;
pub use flow::{Access, Exposure, ResourceFlow, SlotSelector};
pub use group::{GroupBuilder, SlotGroup};
pub use identifier::{DEFAULT_NAMESPACE, Identifier};
pub use layout::{FilterSpec, GroupLayout, SlotLayout, StorageLayout};
pub use mod_count::ModCount;
pub use record::{SlotRecord, StorageRecord};
pub use registry::{DEFAULT_MAX_STACK_SIZE, ItemProperties, ItemRegistry};
pub use resource::{Energy, Fluid, Item, NoTag, Resource, ResourceKind, ResourceStack, units};
pub use role::GroupRole;
pub use slot::{Exchange, ResourceSlot, SlotBuilder};
pub use storage::{ResourceStorage, StorageBuilder};
pub use tag::{Tag, TagValue};

/// Prelude for common imports.
pub mod prelude {
    pub use rgb_transaction::{Outcome, Transaction};

    pub use crate::{
        Energy, Exchange, ExposedSlot, ExposedStorage, Exposure, Fluid, GroupRole, Item,
        ResourceError, ResourceFilter, ResourceFlow, ResourceResult, ResourceSlot,
        ResourceStack, ResourceStorage, SlotGroup, SlotSelector, Tag, units,
    };
}
