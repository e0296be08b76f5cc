//! Slot group roles.

use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

/// What a slot group is for: input, output, storage, ...
///
/// Roles key the groups of a [`ResourceStorage`](crate::ResourceStorage) and
/// must be unique within it.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupRole(Cow<'static, str>);

impl GroupRole {
    pub const INPUT: Self = Self(Cow::Borrowed("input"));
    pub const OUTPUT: Self = Self(Cow::Borrowed("output"));
    pub const STORAGE: Self = Self(Cow::Borrowed("storage"));
    pub const TRANSFER: Self = Self(Cow::Borrowed("transfer"));
    pub const CHARGE: Self = Self(Cow::Borrowed("charge"));
    pub const FUEL: Self = Self(Cow::Borrowed("fuel"));
    pub const BATTERY: Self = Self(Cow::Borrowed("battery"));

    /// A custom role.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// The role's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupRole({})", self.0)
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_equals_builtin() {
        assert_eq!(GroupRole::new("input"), GroupRole::INPUT);
        assert_ne!(GroupRole::INPUT, GroupRole::OUTPUT);
        assert_eq!(GroupRole::new(String::from("coolant")).name(), "coolant");
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&GroupRole::CHARGE).unwrap();
        assert_eq!(json, "\"charge\"");
        assert_eq!(serde_json::from_str::<GroupRole>(&json).unwrap(), GroupRole::CHARGE);
    }
}
