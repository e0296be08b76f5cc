//! Flow restrictions for exposed storage.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::role::GroupRole;

bitflags! {
    /// Operations an external actor may perform through an exposed view.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Access: u8 {
        const INSERT = 1;
        const EXTRACT = 1 << 1;
    }
}

/// Direction resources may move through a machine face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFlow {
    /// Resources may only be inserted.
    Input,
    /// Resources may only be extracted.
    Output,
    /// Resources may move both ways.
    #[default]
    Both,
    /// Nothing may move.
    Disabled,
}

impl ResourceFlow {
    /// The operations this flow permits.
    #[must_use]
    pub const fn access(self) -> Access {
        match self {
            Self::Input => Access::INSERT,
            Self::Output => Access::EXTRACT,
            Self::Both => Access::INSERT.union(Access::EXTRACT),
            Self::Disabled => Access::empty(),
        }
    }

    /// Whether this flow lets resources in.
    #[must_use]
    pub const fn allows_insertion(self) -> bool {
        self.access().contains(Access::INSERT)
    }

    /// Whether this flow lets resources out.
    #[must_use]
    pub const fn allows_extraction(self) -> bool {
        self.access().contains(Access::EXTRACT)
    }
}

/// Who is acting through an exposed view.
///
/// Automation is held to each slot's filter; players are additionally held
/// to the slot's strict filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exposure {
    #[default]
    Automation,
    Player,
}

/// Selects the slots an exposed view covers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSelector {
    /// A single slot, by global index.
    Slot(usize),
    /// Every slot of the group with this role.
    Group(GroupRole),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_access() {
        assert_eq!(ResourceFlow::Input.access(), Access::INSERT);
        assert_eq!(ResourceFlow::Output.access(), Access::EXTRACT);
        assert_eq!(ResourceFlow::Both.access(), Access::all());
        assert!(ResourceFlow::Disabled.access().is_empty());

        assert!(ResourceFlow::Input.allows_insertion());
        assert!(!ResourceFlow::Input.allows_extraction());
        assert!(ResourceFlow::Both.allows_extraction());
    }

    #[test]
    fn test_selector_json() {
        let selector = SlotSelector::Group(GroupRole::OUTPUT);
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(json, r#"{"group":"output"}"#);
        assert_eq!(serde_json::from_str::<SlotSelector>(r#"{"slot":3}"#).unwrap(), SlotSelector::Slot(3));
    }
}
