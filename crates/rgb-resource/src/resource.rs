//! Resource kinds and owned resource stacks.
//!
//! The slot engine is generic over [`Resource`]: a resource identity type
//! plus the tag type it carries. Items and fluids are identified by an
//! [`Identifier`] and carry a [`Tag`]; energy is a bare scalar with no
//! identity beyond [`Energy`] and no possible tag.

use std::{fmt, hash::Hash};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{error::ResourceResult, identifier::Identifier, tag::Tag};

/// Broad category of a resource type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Item,
    Fluid,
    Energy,
}

/// A resource identity that can be stored in a slot.
///
/// Identities are immutable values; two resources are the same kind of
/// thing iff they are equal.
pub trait Resource:
    Clone + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned + 'static
{
    /// Auxiliary payload attached to a stored resource.
    type Tag: Clone + Eq + Hash + fmt::Debug + Serialize + DeserializeOwned + 'static;

    /// Category of this resource type.
    const KIND: ResourceKind;
}

/// An item type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Identifier);

impl Item {
    /// Create an item from its identifier.
    #[must_use]
    pub const fn new(id: Identifier) -> Self {
        Self(id)
    }

    /// Parse an item identifier.
    pub fn parse(text: &str) -> ResourceResult<Self> {
        Identifier::parse(text).map(Self)
    }

    /// The item's identifier.
    #[must_use]
    pub const fn id(&self) -> &Identifier {
        &self.0
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item({})", self.0)
    }
}

impl Resource for Item {
    type Tag = Tag;

    const KIND: ResourceKind = ResourceKind::Item;
}

/// A fluid type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fluid(Identifier);

impl Fluid {
    /// Create a fluid from its identifier.
    #[must_use]
    pub const fn new(id: Identifier) -> Self {
        Self(id)
    }

    /// Parse a fluid identifier.
    pub fn parse(text: &str) -> ResourceResult<Self> {
        Identifier::parse(text).map(Self)
    }

    /// The fluid's identifier.
    #[must_use]
    pub const fn id(&self) -> &Identifier {
        &self.0
    }
}

impl fmt::Debug for Fluid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fluid({})", self.0)
    }
}

impl Resource for Fluid {
    type Tag = Tag;

    const KIND: ResourceKind = ResourceKind::Fluid;
}

/// Energy: a resource with a single identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Energy;

/// Tag type of resources that can never carry a tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoTag {}

impl Resource for Energy {
    type Tag = NoTag;

    const KIND: ResourceKind = ResourceKind::Energy;
}

/// Fluid amounts, in droplets.
pub mod units {
    /// One bucket.
    pub const BUCKET: u64 = 81_000;
    /// One block worth of fluid.
    pub const BLOCK: u64 = 81_000;
    /// One bottle (a third of a bucket).
    pub const BOTTLE: u64 = 27_000;
    /// One ingot of molten metal.
    pub const INGOT: u64 = 9_000;
    /// One nugget of molten metal.
    pub const NUGGET: u64 = 1_000;
    /// Smallest fluid unit.
    pub const DROPLET: u64 = 1;
}

/// An owned `(resource, tag, amount)` triple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct ResourceStack<R: Resource> {
    pub resource: R,
    pub tag: Option<R::Tag>,
    pub amount: u64,
}

impl<R: Resource> ResourceStack<R> {
    /// Create a stack.
    #[must_use]
    pub const fn new(resource: R, tag: Option<R::Tag>, amount: u64) -> Self {
        Self {
            resource,
            tag,
            amount,
        }
    }

    /// Create an untagged stack.
    #[must_use]
    pub const fn of(resource: R, amount: u64) -> Self {
        Self::new(resource, None, amount)
    }

    /// Whether this stack holds exactly `resource` with exactly `tag`.
    #[must_use]
    pub fn matches(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.resource == *resource && self.tag.as_ref() == tag
    }

    /// Same resource and tag, different amount.
    #[must_use]
    pub fn with_amount(&self, amount: u64) -> Self {
        Self::new(self.resource.clone(), self.tag.clone(), amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_is_tag_exact() {
        let water = Fluid::parse("water").unwrap();
        let tagged = ResourceStack::new(water.clone(), Some(Tag::new().with("hot", 1i8)), 10);
        let plain = ResourceStack::of(water.clone(), 10);

        assert!(plain.matches(&water, None));
        assert!(!plain.matches(&water, Some(&Tag::new())));
        assert!(!tagged.matches(&water, None));
        assert!(tagged.matches(&water, tagged.tag.as_ref()));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Item::KIND, ResourceKind::Item);
        assert_eq!(Fluid::KIND, ResourceKind::Fluid);
        assert_eq!(Energy::KIND, ResourceKind::Energy);
    }

    #[test]
    fn test_item_serializes_as_identifier() {
        let item = Item::parse("minecraft:iron_ingot").unwrap();
        assert_eq!(serde_json::to_string(&item).unwrap(), "\"minecraft:iron_ingot\"");
        assert_eq!(format!("{item:?}"), "Item(minecraft:iron_ingot)");
    }

    #[test]
    fn test_energy_stack_bincode() {
        let stack = ResourceStack::of(Energy, 4_000);
        let bytes = bincode::serialize(&stack).unwrap();
        assert_eq!(bincode::deserialize::<ResourceStack<Energy>>(&bytes).unwrap(), stack);
    }
}
