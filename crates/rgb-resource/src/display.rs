//! Layout anchors for menus.
//!
//! The engine never computes these; it stores them so the menu layer can
//! place each slot.

use serde::{Deserialize, Serialize};

use crate::identifier::Identifier;

/// Where a slot is drawn, and with which background icon.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotDisplay {
    x: i32,
    y: i32,
    #[serde(default)]
    icon: Option<Identifier>,
}

impl SlotDisplay {
    /// Anchor at `(x, y)` with no icon.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y, icon: None }
    }

    /// Attach a background icon.
    #[must_use]
    pub fn with_icon(mut self, icon: Identifier) -> Self {
        self.icon = Some(icon);
        self
    }

    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    #[must_use]
    pub const fn icon(&self) -> Option<&Identifier> {
        self.icon.as_ref()
    }
}
