//! Ordered groups of slots.
//!
//! Aggregate operations visit member slots left to right, lowest index
//! first, until the requested amount is exhausted.

use std::{fmt, rc::Rc};

use rgb_transaction::Transaction;

use crate::{
    error::{ResourceError, ResourceResult},
    filter::ResourceFilter,
    mod_count::ModCount,
    record::SlotRecord,
    resource::{Resource, ResourceStack},
    role::GroupRole,
    slot::ResourceSlot,
};

/// Move up to `amount` through `slots` in order, `step` moving at most the
/// remainder through one slot.
pub(crate) fn fan_out<'a, R: Resource>(
    slots: impl IntoIterator<Item = &'a ResourceSlot<R>>,
    amount: u64,
    mut step: impl FnMut(&'a ResourceSlot<R>, u64) -> u64,
) -> u64 {
    let mut moved = 0;
    for slot in slots {
        if moved >= amount {
            break;
        }
        moved += step(slot, amount - moved);
    }
    moved
}

/// Replace the contents of `slots` with `records`, all or nothing.
///
/// Every record is checked and every slot must be free of transactional
/// changes before the first slot is written.
pub(crate) fn load_slots<R: Resource>(
    slots: &[&ResourceSlot<R>],
    records: &[SlotRecord<R>],
) -> ResourceResult<()> {
    if records.len() != slots.len() {
        tracing::warn!(expected = slots.len(), found = records.len(), "rejected slot records");
        return Err(ResourceError::SlotCountMismatch {
            expected: slots.len(),
            found: records.len(),
        });
    }

    let contents = slots
        .iter()
        .zip(records)
        .enumerate()
        .map(|(index, (slot, record))| {
            slot.check_record(record).map_err(|err| {
                tracing::warn!(index, %err, "rejected slot record");
                ResourceError::InvalidRecord {
                    index,
                    source: Box::new(err),
                }
            })
        })
        .collect::<ResourceResult<Vec<_>>>()?;

    for slot in slots {
        slot.assert_immediate();
    }
    for (slot, contents) in slots.iter().zip(contents) {
        slot.replace_immediate(contents);
    }
    Ok(())
}

/// A fixed-size, ordered collection of same-kind slots sharing a role.
pub struct SlotGroup<R: Resource> {
    role: GroupRole,
    slots: Box<[ResourceSlot<R>]>,
    mod_count: Rc<ModCount>,
}

impl<R: Resource> SlotGroup<R> {
    #[must_use]
    pub fn builder(role: GroupRole) -> GroupBuilder<R> {
        GroupBuilder {
            role,
            slots: Vec::new(),
        }
    }

    #[must_use]
    pub const fn role(&self) -> &GroupRole {
        &self.role
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn slot(&self, index: usize) -> Option<&ResourceSlot<R>> {
        self.slots.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceSlot<R>> {
        self.slots.iter()
    }

    /// Committed modifications of any member slot.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.mod_count.get()
    }

    pub(crate) const fn mod_count(&self) -> &Rc<ModCount> {
        &self.mod_count
    }

    /// Whether every member slot is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(ResourceSlot::is_empty)
    }

    /// Whether every member slot is full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.iter().all(ResourceSlot::is_full)
    }

    /// Whether any slot holds `resource` with exactly `tag`.
    #[must_use]
    pub fn contains(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.slots.iter().any(|slot| slot.contains(resource, tag))
    }

    /// Whether any slot holds something `filter` accepts.
    #[must_use]
    pub fn contains_any(&self, filter: &ResourceFilter<R>) -> bool {
        self.slots.iter().any(|slot| {
            slot.with_contents(|held| {
                held.is_some_and(|held| filter.matches(&held.resource, held.tag.as_ref()))
            })
        })
    }

    /// Total amount of `resource` with exactly `tag` across the group.
    #[must_use]
    pub fn amount_of(&self, resource: &R, tag: Option<&R::Tag>) -> u64 {
        self.slots
            .iter()
            .filter(|slot| slot.contains(resource, tag))
            .map(ResourceSlot::amount)
            .sum()
    }

    /// How much of `amount` [`insert`](Self::insert) would accept.
    ///
    /// Slots are independent, so this is also what
    /// [`insert_merging`](Self::insert_merging) would accept.
    #[must_use]
    pub fn simulate_insert(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.simulate_insert(resource, tag, rest)
        })
    }

    #[must_use]
    pub fn simulate_extract(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.simulate_extract(resource, tag, rest)
        })
    }

    #[must_use]
    pub fn simulate_extract_any(&self, resource: &R, amount: u64) -> u64 {
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.simulate_extract_any(resource, rest)
        })
    }

    /// Whether at least one unit of `resource` with `tag` would be accepted.
    #[must_use]
    pub fn can_insert(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.simulate_insert(resource, tag, 1) > 0
    }

    /// Whether at least one unit of `resource` with `tag` could be extracted.
    #[must_use]
    pub fn can_extract(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.simulate_extract(resource, tag, 1) > 0
    }

    /// Insert into each slot in index order until `amount` is placed.
    ///
    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn insert<'a>(
        &'a self,
        resource: &R,
        tag: Option<&R::Tag>,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> u64 {
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.insert(resource, tag, rest, tx)
        })
    }

    /// Insert into slots already holding `resource` with `tag` first, then
    /// into blank slots, each pass in index order.
    ///
    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn insert_merging<'a>(
        &'a self,
        resource: &R,
        tag: Option<&R::Tag>,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> u64 {
        let merged = fan_out(
            self.slots.iter().filter(|slot| slot.contains(resource, tag)),
            amount,
            |slot, rest| slot.insert(resource, tag, rest, tx),
        );
        merged
            + fan_out(
                self.slots.iter().filter(|slot| slot.is_empty()),
                amount - merged,
                |slot, rest| slot.insert(resource, tag, rest, tx),
            )
    }

    /// Extract `resource` with exactly `tag` from each slot in index order.
    ///
    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn extract<'a>(
        &'a self,
        resource: &R,
        tag: Option<&R::Tag>,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> u64 {
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.extract(resource, tag, rest, tx)
        })
    }

    /// Extract `resource` with any tag from each slot in index order.
    ///
    /// # Panics
    ///
    /// Panics if a touched slot has uncommitted changes in another transaction.
    pub fn extract_any<'a>(&'a self, resource: &R, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.extract_any(resource, rest, tx)
        })
    }

    /// Insert into each slot in index order, without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any member slot has uncommitted transactional changes.
    pub fn insert_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.assert_immediate();
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.insert_immediate(resource, tag, rest)
        })
    }

    /// Extract `resource` with exactly `tag` in index order, without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any member slot has uncommitted transactional changes.
    pub fn extract_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.assert_immediate();
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.extract_immediate(resource, tag, rest)
        })
    }

    /// Extract `resource` with any tag in index order, without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if any member slot has uncommitted transactional changes.
    pub fn extract_any_immediate(&self, resource: &R, amount: u64) -> u64 {
        self.assert_immediate();
        fan_out(&*self.slots, amount, |slot, rest| {
            slot.extract_any_immediate(resource, rest)
        })
    }

    /// Checked up front so an immediate fan-out never stops half way.
    fn assert_immediate(&self) {
        for slot in &*self.slots {
            slot.assert_immediate();
        }
    }

    #[must_use]
    pub fn is_sane(&self) -> bool {
        self.slots.iter().all(ResourceSlot::is_sane)
    }

    /// A copy of every member slot's contents, in index order.
    #[must_use]
    pub fn contents(&self) -> Vec<Option<ResourceStack<R>>> {
        self.slots.iter().map(ResourceSlot::contents).collect()
    }

    /// Persistent form of every member slot, in index order.
    #[must_use]
    pub fn record(&self) -> Vec<SlotRecord<R>> {
        self.slots.iter().map(ResourceSlot::record).collect()
    }

    /// Load one record per member slot.
    ///
    /// All records are checked before any slot is touched.
    ///
    /// # Errors
    ///
    /// [`ResourceError::SlotCountMismatch`] on a record count other than
    /// [`len`](Self::len), [`ResourceError::InvalidRecord`] if a slot cannot
    /// hold its recorded contents.
    ///
    /// # Panics
    ///
    /// Panics if any member slot has uncommitted transactional changes.
    pub fn load_record(&self, records: &[SlotRecord<R>]) -> ResourceResult<()> {
        let slots: Vec<&ResourceSlot<R>> = self.slots.iter().collect();
        load_slots(&slots, records)
    }
}

impl<'g, R: Resource> IntoIterator for &'g SlotGroup<R> {
    type IntoIter = std::slice::Iter<'g, ResourceSlot<R>>;
    type Item = &'g ResourceSlot<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<R: Resource> fmt::Debug for SlotGroup<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotGroup")
            .field("role", &self.role)
            .field("slots", &self.slots)
            .field("version", &self.version())
            .finish()
    }
}

/// Builder for [`SlotGroup`].
#[derive(Debug)]
pub struct GroupBuilder<R: Resource> {
    role: GroupRole,
    slots: Vec<ResourceSlot<R>>,
}

impl<R: Resource> GroupBuilder<R> {
    #[must_use]
    pub fn slot(mut self, slot: ResourceSlot<R>) -> Self {
        self.slots.push(slot);
        self
    }

    #[must_use]
    pub fn slots(mut self, slots: impl IntoIterator<Item = ResourceSlot<R>>) -> Self {
        self.slots.extend(slots);
        self
    }

    /// # Errors
    ///
    /// [`ResourceError::EmptyGroup`] if no slot was added.
    pub fn build(self) -> ResourceResult<SlotGroup<R>> {
        if self.slots.is_empty() {
            return Err(ResourceError::EmptyGroup(self.role));
        }

        let mod_count = ModCount::root();
        for slot in &self.slots {
            slot.mod_count().attach(&mod_count);
        }

        Ok(SlotGroup {
            role: self.role,
            slots: self.slots.into_boxed_slice(),
            mod_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        capacity::StackLimited,
        registry::ItemRegistry,
        resource::Item,
        tag::Tag,
    };

    fn iron() -> Item {
        Item::parse("iron_ingot").unwrap()
    }

    fn gold() -> Item {
        Item::parse("gold_ingot").unwrap()
    }

    fn group(size: usize) -> SlotGroup<Item> {
        let registry = Rc::new(ItemRegistry::new());
        let policy: Rc<StackLimited> = Rc::new(StackLimited::new(registry));
        SlotGroup::builder(GroupRole::INPUT)
            .slots((0..size).map(|_| {
                ResourceSlot::builder(64)
                    .policy(policy.clone())
                    .build()
                    .unwrap()
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn test_fan_out_fills_in_order() {
        let group = group(2);
        group.slot(0).unwrap().insert_immediate(&iron(), None, 10);

        let mut tx = Transaction::open();
        assert_eq!(group.insert(&iron(), None, 60, &mut tx), 60);
        tx.commit();

        assert_eq!(group.slot(0).unwrap().amount(), 64);
        assert_eq!(group.slot(1).unwrap().amount(), 6);
        assert_eq!(group.amount_of(&iron(), None), 70);
    }

    #[test]
    fn test_insert_stops_when_full() {
        let group = group(2);
        let mut tx = Transaction::open();
        assert_eq!(group.simulate_insert(&iron(), None, 500), 128);
        assert_eq!(group.insert(&iron(), None, 500, &mut tx), 128);
        assert_eq!(group.insert(&gold(), None, 1, &mut tx), 0);
        tx.commit();
        assert!(group.is_full());
        assert!(!group.can_insert(&iron(), None));
    }

    #[test]
    fn test_insert_merging_prefers_matching_slot() {
        let group = group(3);
        group.slot(1).unwrap().insert_immediate(&iron(), None, 60);

        let mut tx = Transaction::open();
        assert_eq!(group.insert_merging(&iron(), None, 10, &mut tx), 10);
        tx.commit();

        assert_eq!(group.slot(0).unwrap().amount(), 6);
        assert_eq!(group.slot(1).unwrap().amount(), 64);
        assert!(group.slot(2).unwrap().is_empty());
    }

    #[test]
    fn test_plain_insert_takes_lowest_index() {
        let group = group(2);
        group.slot(1).unwrap().insert_immediate(&iron(), None, 60);

        let mut tx = Transaction::open();
        group.insert(&iron(), None, 10, &mut tx);
        tx.commit();

        assert_eq!(group.slot(0).unwrap().amount(), 10);
        assert_eq!(group.slot(1).unwrap().amount(), 60);
    }

    #[test]
    fn test_extract_across_slots() {
        let group = group(3);
        let marked = Tag::new().with("marked", 1i8);
        group.slot(0).unwrap().insert_immediate(&iron(), None, 5);
        group.slot(1).unwrap().insert_immediate(&iron(), Some(&marked), 5);
        group.slot(2).unwrap().insert_immediate(&iron(), None, 5);

        assert_eq!(group.simulate_extract(&iron(), None, 100), 10);
        assert_eq!(group.simulate_extract_any(&iron(), 100), 15);

        let mut tx = Transaction::open();
        assert_eq!(group.extract(&iron(), None, 7, &mut tx), 7);
        assert_eq!(group.extract_any(&iron(), 100, &mut tx), 8);
        tx.commit();
        assert!(group.is_empty());
        assert!(!group.can_extract(&iron(), None));
    }

    #[test]
    fn test_abort_restores_every_slot() {
        let group = group(2);
        group.slot(0).unwrap().insert_immediate(&gold(), None, 3);
        let before = group.contents();
        let version = group.version();

        let mut tx = Transaction::open();
        group.extract(&gold(), None, 3, &mut tx);
        group.insert(&iron(), None, 100, &mut tx);
        tx.abort();

        assert_eq!(group.contents(), before);
        assert_eq!(group.version(), version);
    }

    #[test]
    fn test_version_counts_slot_commits() {
        let group = group(2);
        let mut tx = Transaction::open();
        group.insert(&iron(), None, 100, &mut tx);
        tx.commit();
        assert_eq!(group.version(), 2);
    }

    #[test]
    fn test_contains() {
        let group = group(2);
        group.slot(1).unwrap().insert_immediate(&gold(), None, 1);
        assert!(group.contains(&gold(), None));
        assert!(!group.contains(&gold(), Some(&Tag::new())));
        assert!(group.contains_any(&ResourceFilter::of_resources([iron(), gold()])));
        assert!(!group.contains_any(&ResourceFilter::of_resource(iron())));
    }

    #[test]
    fn test_load_record_counts_changes() {
        let group = group(2);
        let blank = group.record();
        group.slot(0).unwrap().insert_immediate(&iron(), None, 1);
        assert_eq!(group.version(), 1);

        group.load_record(&blank).unwrap();
        assert!(group.is_empty());
        assert_eq!(group.version(), 2);

        group.load_record(&blank).unwrap();
        assert_eq!(group.version(), 2);
    }

    #[test]
    fn test_load_record_rejects_invalid_contents() {
        let group = SlotGroup::builder(GroupRole::FUEL)
            .slot(
                ResourceSlot::builder(16)
                    .filter(ResourceFilter::of_resource(iron()))
                    .build()
                    .unwrap(),
            )
            .slot(ResourceSlot::with_capacity(16).unwrap())
            .build()
            .unwrap();
        group.slot(1).unwrap().insert_immediate(&gold(), None, 4);
        let before = group.contents();
        let filled = |resource: Item, amount| SlotRecord::Filled {
            resource,
            tag: None,
            amount,
        };

        let zero = [SlotRecord::Empty, filled(iron(), 0)];
        let filtered = [filled(gold(), 1), SlotRecord::Empty];
        let too_much = [SlotRecord::Empty, filled(iron(), 17)];
        for records in [zero, filtered, too_much] {
            assert!(matches!(
                group.load_record(&records),
                Err(ResourceError::InvalidRecord { .. })
            ));
            assert_eq!(group.contents(), before);
            assert!(group.is_sane());
        }
        assert!(matches!(
            group.load_record(&[SlotRecord::Empty]),
            Err(ResourceError::SlotCountMismatch { expected: 2, found: 1 })
        ));
        assert_eq!(group.version(), 1);
    }

    #[test]
    #[should_panic(expected = "immediate mutation")]
    fn test_load_record_during_transaction_panics() {
        let group = group(2);
        let blank = group.record();
        let mut tx = Transaction::open();
        group.insert(&iron(), None, 1, &mut tx);
        let _ = group.load_record(&blank);
    }

    #[test]
    fn test_immediate_fan_out() {
        let group = group(3);
        let marked = Tag::new().with("marked", 1i8);
        assert_eq!(group.insert_immediate(&iron(), None, 100), 100);
        assert_eq!(group.slot(0).unwrap().amount(), 64);
        assert_eq!(group.slot(1).unwrap().amount(), 36);
        assert_eq!(group.version(), 2);

        group.slot(2).unwrap().insert_immediate(&iron(), Some(&marked), 5);
        assert_eq!(group.extract_immediate(&iron(), None, 70), 70);
        assert_eq!(group.amount_of(&iron(), None), 30);
        assert_eq!(group.extract_any_immediate(&iron(), 100), 35);
        assert!(group.is_empty());
        assert_eq!(group.extract_immediate(&iron(), None, 1), 0);
    }

    #[test]
    #[should_panic(expected = "immediate mutation")]
    fn test_immediate_fan_out_checks_every_slot_first() {
        let group = group(2);
        let mut tx = Transaction::open();
        group.slot(1).unwrap().insert(&gold(), None, 1, &mut tx);
        group.insert_immediate(&iron(), None, 1);
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(
            SlotGroup::<Item>::builder(GroupRole::OUTPUT).build(),
            Err(ResourceError::EmptyGroup(role)) if role == GroupRole::OUTPUT
        ));
    }
}
