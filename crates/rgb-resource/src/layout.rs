//! Declarative storage layouts.
//!
//! A machine's slots can be described as data and loaded from JSON:
//!
//! ```json
//! {
//!   "groups": [
//!     { "role": "input", "slots": [{ "capacity": 64, "filter": { "resource": "iron_ore" } }] },
//!     { "role": "output", "slots": [{ "capacity": 64, "display": { "x": 116, "y": 35 } }] }
//!   ]
//! }
//! ```

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    capacity::{CapacityPolicy, Fixed},
    display::SlotDisplay,
    error::ResourceResult,
    filter::ResourceFilter,
    group::SlotGroup,
    resource::Resource,
    role::GroupRole,
    slot::ResourceSlot,
    storage::ResourceStorage,
};

/// Serializable description of a [`ResourceFilter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "", rename_all = "snake_case")]
pub enum FilterSpec<R: Resource> {
    Any,
    #[serde(rename = "none")]
    Reject,
    Resource(R),
    Resources(Vec<R>),
    Exact {
        resource: R,
        #[serde(default)]
        tag: Option<R::Tag>,
    },
    Not(Box<FilterSpec<R>>),
    All(Vec<FilterSpec<R>>),
    AnyOf(Vec<FilterSpec<R>>),
}

impl<R: Resource> Default for FilterSpec<R> {
    fn default() -> Self {
        Self::Any
    }
}

impl<R: Resource> FilterSpec<R> {
    #[must_use]
    pub fn build(&self) -> ResourceFilter<R> {
        match self {
            Self::Any => ResourceFilter::any(),
            Self::Reject => ResourceFilter::none(),
            Self::Resource(resource) => ResourceFilter::of_resource(resource.clone()),
            Self::Resources(resources) => ResourceFilter::of_resources(resources.iter().cloned()),
            Self::Exact { resource, tag } => {
                ResourceFilter::of_resource_and_tag(resource.clone(), tag.clone())
            }
            Self::Not(inner) => inner.build().negate(),
            Self::All(parts) => parts
                .iter()
                .map(Self::build)
                .reduce(|all, part| all.and(&part))
                .unwrap_or_else(ResourceFilter::any),
            Self::AnyOf(parts) => parts
                .iter()
                .map(Self::build)
                .reduce(|any, part| any.or(&part))
                .unwrap_or_else(ResourceFilter::none),
        }
    }
}

/// One slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct SlotLayout<R: Resource> {
    pub capacity: u64,
    #[serde(default)]
    pub display: SlotDisplay,
    #[serde(default)]
    pub filter: FilterSpec<R>,
    /// Player filter; the slot filter when absent.
    #[serde(default)]
    pub strict_filter: Option<FilterSpec<R>>,
}

impl<R: Resource> SlotLayout<R> {
    /// # Errors
    ///
    /// See [`SlotBuilder::build`](crate::SlotBuilder::build).
    pub fn build(&self, policy: &Rc<dyn CapacityPolicy<R>>) -> ResourceResult<ResourceSlot<R>> {
        let mut builder = ResourceSlot::builder(self.capacity)
            .policy(Rc::clone(policy))
            .filter(self.filter.build())
            .display(self.display.clone());
        if let Some(strict) = &self.strict_filter {
            builder = builder.strict_filter(strict.build());
        }
        builder.build()
    }
}

/// One group of slots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct GroupLayout<R: Resource> {
    pub role: GroupRole,
    pub slots: Vec<SlotLayout<R>>,
}

impl<R: Resource> GroupLayout<R> {
    /// # Errors
    ///
    /// Fails on an empty group or an invalid slot.
    pub fn build(&self, policy: &Rc<dyn CapacityPolicy<R>>) -> ResourceResult<SlotGroup<R>> {
        let slots = self
            .slots
            .iter()
            .map(|slot| slot.build(policy))
            .collect::<ResourceResult<Vec<_>>>()?;
        SlotGroup::builder(self.role.clone()).slots(slots).build()
    }
}

/// A whole storage.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct StorageLayout<R: Resource> {
    pub groups: Vec<GroupLayout<R>>,
}

impl<R: Resource> Default for StorageLayout<R> {
    fn default() -> Self {
        Self { groups: Vec::new() }
    }
}

impl<R: Resource> StorageLayout<R> {
    /// # Errors
    ///
    /// [`ResourceError::Layout`](crate::ResourceError::Layout) on malformed JSON.
    pub fn from_json(json: &str) -> ResourceResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// [`ResourceError::Layout`](crate::ResourceError::Layout) if serialization fails.
    pub fn to_json(&self) -> ResourceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Build a storage whose slots use the [`Fixed`] capacity policy.
    ///
    /// # Errors
    ///
    /// See [`build_with_policy`](Self::build_with_policy).
    pub fn build(&self) -> ResourceResult<ResourceStorage<R>> {
        self.build_with_policy(Rc::new(Fixed))
    }

    /// Build a storage whose slots all use `policy`.
    ///
    /// Groups without slots are left out; a layout with no slots at all
    /// builds [`ResourceStorage::empty`].
    ///
    /// # Errors
    ///
    /// Fails on a zero capacity or a duplicate role.
    pub fn build_with_policy(
        &self,
        policy: Rc<dyn CapacityPolicy<R>>,
    ) -> ResourceResult<ResourceStorage<R>> {
        let mut builder = ResourceStorage::builder();
        for group in self.groups.iter().filter(|group| !group.slots.is_empty()) {
            builder = builder.group(group.build(&policy)?);
        }
        builder.build()
    }
}
