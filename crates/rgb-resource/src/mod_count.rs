//! Modification counters.
//!
//! Each slot, group and storage owns a [`ModCount`]. Counters form a tree:
//! a slot's counter is parented to its group's, the group's to the storage's
//! root. Incrementing a counter increments every ancestor, so a single
//! number per storage answers "has anything changed since I last looked".

use std::{
    cell::{Cell, OnceCell},
    fmt,
    rc::Rc,
};

/// Monotonic modification counter with optional parent.
#[derive(Default)]
pub struct ModCount {
    value: Cell<u64>,
    parent: OnceCell<Rc<ModCount>>,
}

impl ModCount {
    /// Create a counter at zero with no parent.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            value: Cell::new(0),
            parent: OnceCell::new(),
        }
    }

    /// Create a shareable root counter.
    #[must_use]
    pub fn root() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.get()
    }

    /// Record one modification here and in every ancestor.
    pub fn increment(&self) {
        self.value.set(self.value.get() + 1);
        if let Some(parent) = self.parent.get() {
            parent.increment();
        }
    }

    /// Whether this counter reports to a parent.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.get().is_some()
    }

    /// Parent this counter to `parent`.
    ///
    /// Counters are parented once, when their owner is placed into a group or
    /// storage; a second attempt is ignored and reported.
    pub(crate) fn attach(&self, parent: &Rc<Self>) {
        if self.parent.set(Rc::clone(parent)).is_err() {
            tracing::error!("modification counter already has a parent");
        }
    }
}

impl fmt::Debug for ModCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModCount")
            .field("value", &self.value.get())
            .field("has_parent", &self.has_parent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_propagates() {
        let root = ModCount::root();
        let group = Rc::new(ModCount::new());
        let slot = ModCount::new();
        group.attach(&root);
        slot.attach(&group);

        slot.increment();
        slot.increment();
        group.increment();

        assert_eq!(slot.get(), 2);
        assert_eq!(group.get(), 3);
        assert_eq!(root.get(), 3);
        assert!(slot.has_parent());
        assert!(!root.has_parent());
    }

    #[test]
    fn test_sibling_isolated() {
        let root = ModCount::root();
        let a = ModCount::new();
        let b = ModCount::new();
        a.attach(&root);
        b.attach(&root);

        a.increment();
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 0);
        assert_eq!(root.get(), 1);
    }
}
