//! Permission-gated views for external actors.
//!
//! A view borrows the slots it exposes and gates every operation on the
//! flow it was built with. For player exposure it also applies each slot's
//! strict filter. The slot still applies its own filter afterwards, so a
//! view can only narrow what gets through.

use std::fmt;

use rgb_transaction::Transaction;

use crate::{
    display::SlotDisplay,
    flow::{Access, Exposure, ResourceFlow},
    group::{SlotGroup, fan_out},
    mod_count::ModCount,
    resource::{Resource, ResourceStack},
    slot::{Exchange, ResourceSlot},
};

/// Read-only cursor over one exposed slot.
pub struct SlotCursor<'a, R: Resource> {
    slot: &'a ResourceSlot<R>,
}

impl<R: Resource> SlotCursor<'_, R> {
    #[must_use]
    pub fn contents(&self) -> Option<ResourceStack<R>> {
        self.slot.contents()
    }

    #[must_use]
    pub fn resource(&self) -> Option<R> {
        self.slot.resource()
    }

    #[must_use]
    pub fn amount(&self) -> u64 {
        self.slot.amount()
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.slot.capacity()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot.is_empty()
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.version()
    }

    #[must_use]
    pub fn display(&self) -> &SlotDisplay {
        self.slot.display()
    }
}

impl<R: Resource> Clone for SlotCursor<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Resource> Copy for SlotCursor<'_, R> {}

impl<R: Resource> fmt::Debug for SlotCursor<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotCursor").field(self.slot).finish()
    }
}

/// A gated view of one slot.
pub struct ExposedSlot<'a, R: Resource> {
    slot: &'a ResourceSlot<R>,
    access: Access,
    exposure: Exposure,
}

impl<'a, R: Resource> ExposedSlot<'a, R> {
    #[must_use]
    pub const fn new(slot: &'a ResourceSlot<R>, flow: ResourceFlow, exposure: Exposure) -> Self {
        Self {
            slot,
            access: flow.access(),
            exposure,
        }
    }

    /// Read-only cursor over the underlying slot.
    #[must_use]
    pub const fn cursor(&self) -> SlotCursor<'a, R> {
        SlotCursor { slot: self.slot }
    }

    #[must_use]
    pub const fn access(&self) -> Access {
        self.access
    }

    #[must_use]
    pub const fn exposure(&self) -> Exposure {
        self.exposure
    }

    #[must_use]
    pub const fn supports_insertion(&self) -> bool {
        self.access.contains(Access::INSERT)
    }

    #[must_use]
    pub const fn supports_extraction(&self) -> bool {
        self.access.contains(Access::EXTRACT)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.slot.version()
    }

    #[must_use]
    pub fn contents(&self) -> Option<ResourceStack<R>> {
        self.slot.contents()
    }

    #[must_use]
    pub fn amount(&self) -> u64 {
        self.slot.amount()
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.slot.capacity()
    }

    fn admits(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        match self.exposure {
            Exposure::Automation => true,
            Exposure::Player => self.slot.strict_filter().matches(resource, tag),
        }
    }

    fn may_insert(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.supports_insertion() && self.admits(resource, tag)
    }

    #[must_use]
    pub fn simulate_insert(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        if !self.may_insert(resource, tag) {
            return 0;
        }
        self.slot.simulate_insert(resource, tag, amount)
    }

    #[must_use]
    pub fn simulate_extract(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.simulate_extract(resource, tag, amount)
    }

    #[must_use]
    pub fn simulate_extract_any(&self, resource: &R, amount: u64) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.simulate_extract_any(resource, amount)
    }

    #[must_use]
    pub fn can_insert(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.simulate_insert(resource, tag, 1) > 0
    }

    #[must_use]
    pub fn can_extract(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.simulate_extract(resource, tag, 1) > 0
    }

    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn insert(&self, resource: &R, tag: Option<&R::Tag>, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        if !self.may_insert(resource, tag) {
            return 0;
        }
        self.slot.insert(resource, tag, amount, tx)
    }

    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn extract(&self, resource: &R, tag: Option<&R::Tag>, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.extract(resource, tag, amount, tx)
    }

    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn extract_any(&self, resource: &R, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.extract_any(resource, amount, tx)
    }

    /// [`insert`](Self::insert) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn insert_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        if !self.may_insert(resource, tag) {
            return 0;
        }
        self.slot.insert_immediate(resource, tag, amount)
    }

    /// [`extract`](Self::extract) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn extract_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.extract_immediate(resource, tag, amount)
    }

    /// [`extract_any`](Self::extract_any) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn extract_any_immediate(&self, resource: &R, amount: u64) -> u64 {
        if !self.supports_extraction() {
            return 0;
        }
        self.slot.extract_any_immediate(resource, amount)
    }

    /// Swap the slot's contents for `stack`, as a player does by clicking a
    /// slot with a different stack in hand.
    ///
    /// Only player views that allow both directions can exchange.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn exchange(&self, stack: ResourceStack<R>, tx: &mut Transaction<'a>) -> Exchange<R> {
        let allowed = self.exposure == Exposure::Player
            && self.access.contains(Access::all())
            && self.admits(&stack.resource, stack.tag.as_ref());
        if !allowed {
            return Exchange::Rejected;
        }
        self.slot.exchange(stack, tx)
    }
}

impl<R: Resource> Clone for ExposedSlot<'_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: Resource> Copy for ExposedSlot<'_, R> {}

impl<R: Resource> fmt::Debug for ExposedSlot<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposedSlot")
            .field("slot", self.slot)
            .field("access", &self.access)
            .field("exposure", &self.exposure)
            .finish()
    }
}

/// A gated view of several slots, visited in order.
pub struct ExposedStorage<'a, R: Resource> {
    slots: Vec<&'a ResourceSlot<R>>,
    mod_count: Option<&'a ModCount>,
    access: Access,
    exposure: Exposure,
}

impl<'a, R: Resource> ExposedStorage<'a, R> {
    /// A view of nothing: every operation moves `0`.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            slots: Vec::new(),
            mod_count: None,
            access: Access::empty(),
            exposure: Exposure::Automation,
        }
    }

    pub(crate) fn new(
        slots: Vec<&'a ResourceSlot<R>>,
        mod_count: &'a ModCount,
        flow: ResourceFlow,
        exposure: Exposure,
    ) -> Self {
        Self {
            slots,
            mod_count: Some(mod_count),
            access: flow.access(),
            exposure,
        }
    }

    #[must_use]
    pub fn of_slot(slot: &'a ResourceSlot<R>, flow: ResourceFlow, exposure: Exposure) -> Self {
        Self::new(vec![slot], slot.mod_count(), flow, exposure)
    }

    #[must_use]
    pub fn of_group(group: &'a SlotGroup<R>, flow: ResourceFlow, exposure: Exposure) -> Self {
        Self::new(group.iter().collect(), group.mod_count(), flow, exposure)
    }

    fn view(&self, slot: &'a ResourceSlot<R>) -> ExposedSlot<'a, R> {
        ExposedSlot {
            slot,
            access: self.access,
            exposure: self.exposure,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<ExposedSlot<'a, R>> {
        self.slots.get(index).copied().map(|slot| self.view(slot))
    }

    /// One read-only cursor per exposed slot, in order.
    pub fn iter(&self) -> impl Iterator<Item = SlotCursor<'a, R>> + '_ {
        self.slots.iter().map(|&slot| SlotCursor { slot })
    }

    #[must_use]
    pub const fn supports_insertion(&self) -> bool {
        self.access.contains(Access::INSERT)
    }

    #[must_use]
    pub const fn supports_extraction(&self) -> bool {
        self.access.contains(Access::EXTRACT)
    }

    /// Modification count of the storage this view was taken from.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.mod_count.map_or(0, ModCount::get)
    }

    #[must_use]
    pub fn simulate_insert(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).simulate_insert(resource, tag, rest)
        })
    }

    #[must_use]
    pub fn simulate_extract(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).simulate_extract(resource, tag, rest)
        })
    }

    #[must_use]
    pub fn simulate_extract_any(&self, resource: &R, amount: u64) -> u64 {
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).simulate_extract_any(resource, rest)
        })
    }

    #[must_use]
    pub fn can_insert(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.simulate_insert(resource, tag, 1) > 0
    }

    #[must_use]
    pub fn can_extract(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.simulate_extract(resource, tag, 1) > 0
    }

    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn insert(&self, resource: &R, tag: Option<&R::Tag>, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).insert(resource, tag, rest, tx)
        })
    }

    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn extract(&self, resource: &R, tag: Option<&R::Tag>, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).extract(resource, tag, rest, tx)
        })
    }

    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn extract_any(&self, resource: &R, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).extract_any(resource, rest, tx)
        })
    }

    /// [`insert`](Self::insert) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any exposed slot has uncommitted transactional changes.
    pub fn insert_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.assert_immediate();
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).insert_immediate(resource, tag, rest)
        })
    }

    /// [`extract`](Self::extract) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any exposed slot has uncommitted transactional changes.
    pub fn extract_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.assert_immediate();
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).extract_immediate(resource, tag, rest)
        })
    }

    /// [`extract_any`](Self::extract_any) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any exposed slot has uncommitted transactional changes.
    pub fn extract_any_immediate(&self, resource: &R, amount: u64) -> u64 {
        self.assert_immediate();
        fan_out(self.slots.iter().copied(), amount, |slot, rest| {
            self.view(slot).extract_any_immediate(resource, rest)
        })
    }

    fn assert_immediate(&self) {
        for slot in &self.slots {
            slot.assert_immediate();
        }
    }
}

impl<R: Resource> Default for ExposedStorage<'_, R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: Resource> Clone for ExposedStorage<'_, R> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            mod_count: self.mod_count,
            access: self.access,
            exposure: self.exposure,
        }
    }
}

impl<R: Resource> fmt::Debug for ExposedStorage<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExposedStorage")
            .field("slots", &self.slots.len())
            .field("access", &self.access)
            .field("exposure", &self.exposure)
            .field("version", &self.version())
            .finish()
    }
}
