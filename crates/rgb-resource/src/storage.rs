//! Role-keyed collections of slot groups.
//!
//! A [`ResourceStorage`] is what a machine owns: its input, output, fuel...
//! groups, each registered once under its role. Slots are also addressable
//! by a global index (prior groups' sizes plus the index within the group),
//! which is the order used for records and menu sync.

use std::{fmt, rc::Rc};

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::{
    error::{ResourceError, ResourceResult},
    exposed::ExposedStorage,
    flow::{Exposure, ResourceFlow, SlotSelector},
    group::{SlotGroup, load_slots},
    mod_count::ModCount,
    record::StorageRecord,
    resource::{Resource, ResourceStack},
    role::GroupRole,
    slot::ResourceSlot,
};

/// Top-level resource container of one owner.
pub struct ResourceStorage<R: Resource> {
    groups: Vec<SlotGroup<R>>,
    /// Role to position in `groups`.
    index: HashMap<GroupRole, usize, FxBuildHasher>,
    /// Global index of each group's first slot.
    offsets: Vec<usize>,
    len: usize,
    mod_count: Rc<ModCount>,
}

impl<R: Resource> ResourceStorage<R> {
    #[must_use]
    pub fn builder() -> StorageBuilder<R> {
        StorageBuilder { groups: Vec::new() }
    }

    /// A storage without slots, for owners that hold nothing of this kind.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::with_hasher(FxBuildHasher),
            offsets: Vec::new(),
            len: 0,
            mod_count: ModCount::root(),
        }
    }

    /// Total number of slots.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Committed modifications of any slot in the storage.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.mod_count.get()
    }

    /// Groups in registration order.
    pub fn groups(&self) -> std::slice::Iter<'_, SlotGroup<R>> {
        self.groups.iter()
    }

    #[must_use]
    pub fn group(&self, role: &GroupRole) -> Option<&SlotGroup<R>> {
        self.index.get(role).map(|&position| &self.groups[position])
    }

    #[must_use]
    pub fn has_group(&self, role: &GroupRole) -> bool {
        self.index.contains_key(role)
    }

    /// Every slot in global order.
    pub fn slots(&self) -> impl Iterator<Item = &ResourceSlot<R>> {
        self.groups.iter().flat_map(SlotGroup::iter)
    }

    /// The slot at `global` index.
    #[must_use]
    pub fn slot(&self, global: usize) -> Option<&ResourceSlot<R>> {
        let position = self.offsets.partition_point(|&offset| offset <= global);
        let group = position.checked_sub(1)?;
        self.groups[group].slot(global - self.offsets[group])
    }

    /// Global index of slot `local` of the group with `role`.
    #[must_use]
    pub fn global_index(&self, role: &GroupRole, local: usize) -> Option<usize> {
        let &position = self.index.get(role)?;
        (local < self.groups[position].len()).then(|| self.offsets[position] + local)
    }

    /// Whether every slot upholds its invariants.
    ///
    /// Logs the first offending slot.
    #[must_use]
    pub fn is_sane(&self) -> bool {
        match self.slots().position(|slot| !slot.is_sane()) {
            None => true,
            Some(index) => {
                tracing::error!(index, slot = ?self.slot(index), "slot invariant violated");
                false
            }
        }
    }

    /// Build a gated view of the selected slots.
    ///
    /// A selector naming no slot yields [`ExposedStorage::empty`].
    #[must_use]
    pub fn expose(
        &self,
        selector: &SlotSelector,
        flow: ResourceFlow,
        exposure: Exposure,
    ) -> ExposedStorage<'_, R> {
        let slots: Vec<&ResourceSlot<R>> = match selector {
            SlotSelector::Slot(global) => self.slot(*global).into_iter().collect(),
            SlotSelector::Group(role) => self
                .group(role)
                .map(|group| group.iter().collect())
                .unwrap_or_default(),
        };

        if slots.is_empty() {
            return ExposedStorage::empty();
        }
        ExposedStorage::new(slots, &self.mod_count, flow, exposure)
    }

    /// Expose every slot, in global order.
    #[must_use]
    pub fn expose_all(&self, flow: ResourceFlow, exposure: Exposure) -> ExposedStorage<'_, R> {
        if self.is_empty() {
            return ExposedStorage::empty();
        }
        ExposedStorage::new(self.slots().collect(), &self.mod_count, flow, exposure)
    }

    /// Persistent form of every slot, in global order.
    #[must_use]
    pub fn record(&self) -> StorageRecord<R> {
        self.slots().map(ResourceSlot::record).collect()
    }

    /// Load `record`, replacing every slot's contents.
    ///
    /// All records are checked before any slot is touched, so a rejected
    /// record leaves the storage unchanged.
    ///
    /// # Errors
    ///
    /// [`ResourceError::SlotCountMismatch`] if the record was taken from a
    /// storage of another shape, [`ResourceError::InvalidRecord`] if a slot
    /// cannot hold its recorded contents.
    ///
    /// # Panics
    ///
    /// Panics if a slot has uncommitted transactional changes.
    pub fn load_record(&self, record: &StorageRecord<R>) -> ResourceResult<()> {
        let slots: Vec<&ResourceSlot<R>> = self.slots().collect();
        load_slots(&slots, record.slots())
    }

    /// A copy of every slot's contents, in global order.
    #[must_use]
    pub fn contents(&self) -> Vec<Option<ResourceStack<R>>> {
        self.slots().map(ResourceSlot::contents).collect()
    }
}

impl<R: Resource> Default for ResourceStorage<R> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<R: Resource> fmt::Debug for ResourceStorage<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceStorage")
            .field("groups", &self.groups)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ResourceStorage`].
#[derive(Debug)]
pub struct StorageBuilder<R: Resource> {
    groups: Vec<SlotGroup<R>>,
}

impl<R: Resource> StorageBuilder<R> {
    #[must_use]
    pub fn group(mut self, group: SlotGroup<R>) -> Self {
        self.groups.push(group);
        self
    }

    /// Without any group this is [`ResourceStorage::empty`].
    ///
    /// # Errors
    ///
    /// [`ResourceError::DuplicateGroup`] if two groups share a role.
    pub fn build(self) -> ResourceResult<ResourceStorage<R>> {
        if self.groups.is_empty() {
            return Ok(ResourceStorage::empty());
        }

        let mut index = HashMap::with_capacity_and_hasher(self.groups.len(), FxBuildHasher);
        let mut offsets = Vec::with_capacity(self.groups.len());
        let mut len = 0;

        for (position, group) in self.groups.iter().enumerate() {
            if index.insert(group.role().clone(), position).is_some() {
                return Err(ResourceError::DuplicateGroup(group.role().clone()));
            }
            offsets.push(len);
            len += group.len();
        }

        let mod_count = ModCount::root();
        for group in &self.groups {
            group.mod_count().attach(&mod_count);
        }

        tracing::debug!(groups = self.groups.len(), slots = len, "built resource storage");

        Ok(ResourceStorage {
            groups: self.groups,
            index,
            offsets,
            len,
            mod_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use rgb_transaction::Transaction;
    use tracing_subscriber::{layer::Context, prelude::*};

    use super::*;
    use crate::{
        filter::ResourceFilter,
        record::SlotRecord,
        resource::{Fluid, units::BUCKET},
    };

    /// Counts `ERROR` events.
    #[derive(Clone, Default)]
    struct ErrorCount(Arc<AtomicUsize>);

    impl ErrorCount {
        fn get(&self) -> usize {
            self.0.load(Ordering::Relaxed)
        }
    }

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for ErrorCount {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == tracing::Level::ERROR {
                self.0.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn water() -> Fluid {
        Fluid::parse("water").unwrap()
    }

    fn tanks(role: GroupRole, count: usize) -> SlotGroup<Fluid> {
        SlotGroup::builder(role)
            .slots((0..count).map(|_| ResourceSlot::with_capacity(4 * BUCKET).unwrap()))
            .build()
            .unwrap()
    }

    fn boiler() -> ResourceStorage<Fluid> {
        ResourceStorage::builder()
            .group(tanks(GroupRole::INPUT, 2))
            .group(tanks(GroupRole::OUTPUT, 1))
            .group(tanks(GroupRole::STORAGE, 3))
            .build()
            .unwrap()
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let result = ResourceStorage::builder()
            .group(tanks(GroupRole::INPUT, 1))
            .group(tanks(GroupRole::INPUT, 1))
            .build();
        assert!(matches!(result, Err(ResourceError::DuplicateGroup(role)) if role == GroupRole::INPUT));
    }

    #[test]
    fn test_flat_indexing() {
        let storage = boiler();
        assert_eq!(storage.len(), 6);
        assert_eq!(storage.global_index(&GroupRole::INPUT, 1), Some(1));
        assert_eq!(storage.global_index(&GroupRole::OUTPUT, 0), Some(2));
        assert_eq!(storage.global_index(&GroupRole::STORAGE, 2), Some(5));
        assert_eq!(storage.global_index(&GroupRole::OUTPUT, 1), None);
        assert_eq!(storage.global_index(&GroupRole::FUEL, 0), None);

        let output = storage.group(&GroupRole::OUTPUT).unwrap().slot(0).unwrap();
        assert!(std::ptr::eq(storage.slot(2).unwrap(), output));
        assert!(storage.slot(6).is_none());
        assert_eq!(storage.slots().count(), 6);
    }

    #[test]
    fn test_version_propagates_to_root() {
        let storage = boiler();
        let slot = storage.slot(4).unwrap();

        let mut tx = Transaction::open();
        slot.insert(&water(), None, BUCKET, &mut tx);
        assert_eq!(storage.version(), 0);
        tx.commit();

        assert_eq!(storage.version(), 1);
        assert_eq!(storage.group(&GroupRole::STORAGE).unwrap().version(), 1);
        assert_eq!(storage.group(&GroupRole::INPUT).unwrap().version(), 0);
    }

    #[test]
    fn test_abort_leaves_version() {
        let storage = boiler();
        let mut tx = Transaction::open();
        for slot in storage.slots() {
            slot.insert(&water(), None, BUCKET, &mut tx);
        }
        tx.abort();
        assert_eq!(storage.version(), 0);
        assert!(storage.slots().all(ResourceSlot::is_empty));
    }

    #[test]
    fn test_expose_selectors() {
        let storage = boiler();
        let view = storage.expose(&SlotSelector::Group(GroupRole::STORAGE), ResourceFlow::Input, Exposure::Automation);
        assert_eq!(view.len(), 3);

        let single = storage.expose(&SlotSelector::Slot(2), ResourceFlow::Both, Exposure::Automation);
        assert_eq!(single.len(), 1);

        let missing = storage.expose(&SlotSelector::Group(GroupRole::FUEL), ResourceFlow::Both, Exposure::Automation);
        assert!(missing.is_empty());
        let out_of_range = storage.expose(&SlotSelector::Slot(99), ResourceFlow::Both, Exposure::Automation);
        assert!(out_of_range.is_empty());

        let mut tx = Transaction::open();
        assert_eq!(view.insert(&water(), None, 9 * BUCKET, &mut tx), 9 * BUCKET);
        tx.commit();
        assert_eq!(view.version(), storage.version());
        assert_eq!(storage.version(), 3);
    }

    #[test]
    fn test_record_round_trip() {
        let storage = boiler();
        storage.slot(0).unwrap().insert_immediate(&water(), None, BUCKET);
        storage.slot(5).unwrap().insert_immediate(&water(), None, 3 * BUCKET);

        let bytes = storage.record().to_bytes().unwrap();
        let copy = boiler();
        copy.load_record(&StorageRecord::from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(copy.contents(), storage.contents());
        assert_eq!(copy.version(), 2);
        assert!(copy.is_sane());
    }

    #[test]
    fn test_load_rejects_atomically() {
        let storage = boiler();
        storage.slot(0).unwrap().insert_immediate(&water(), None, BUCKET);
        let before = storage.contents();

        let mut slots: Vec<SlotRecord<Fluid>> = vec![SlotRecord::Empty; 6];
        slots[3] = SlotRecord::Filled {
            resource: water(),
            tag: None,
            amount: 5 * BUCKET,
        };
        let result = storage.load_record(&StorageRecord::new(slots));
        assert!(matches!(result, Err(ResourceError::InvalidRecord { index: 3, .. })));
        assert_eq!(storage.contents(), before);

        let short = StorageRecord::new(vec![SlotRecord::Empty]);
        assert!(matches!(
            storage.load_record(&short),
            Err(ResourceError::SlotCountMismatch { expected: 6, found: 1 })
        ));
    }

    fn water_tank() -> ResourceStorage<Fluid> {
        ResourceStorage::builder()
            .group(
                SlotGroup::builder(GroupRole::STORAGE)
                    .slot(
                        ResourceSlot::builder(BUCKET)
                            .filter(ResourceFilter::of_resource(water()))
                            .build()
                            .unwrap(),
                    )
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_load_keeps_slot_invariants() {
        let storage = water_tank();
        let lava = Fluid::parse("lava").unwrap();
        storage.slot(0).unwrap().insert_immediate(&water(), None, 10);
        let before = storage.contents();

        let broken = [
            (lava.clone(), 0),
            (lava, 5 * BUCKET),
            (water(), 0),
            (water(), 2 * BUCKET),
        ];
        for (resource, amount) in broken {
            let record = StorageRecord::new(vec![SlotRecord::Filled {
                resource,
                tag: None,
                amount,
            }]);
            assert!(matches!(
                storage.load_record(&record),
                Err(ResourceError::InvalidRecord { index: 0, .. })
            ));
            assert_eq!(storage.contents(), before);
            assert!(storage.is_sane());
        }
        assert_eq!(storage.version(), 1);
    }

    #[test]
    #[should_panic(expected = "immediate mutation")]
    fn test_load_during_transaction_panics() {
        let storage = water_tank();
        let blank = storage.record();
        let mut tx = Transaction::open();
        storage.slot(0).unwrap().insert(&water(), None, 1, &mut tx);
        let _ = storage.load_record(&blank);
    }

    #[test]
    fn test_is_sane_reports_broken_slot() {
        let errors = ErrorCount::default();
        let subscriber = tracing_subscriber::registry().with(errors.clone());

        tracing::subscriber::with_default(subscriber, || {
            let storage = boiler();
            assert!(storage.is_sane());
            assert_eq!(errors.get(), 0);

            storage
                .slot(4)
                .unwrap()
                .overwrite_unchecked(Some(ResourceStack::of(water(), 0)));
            assert!(!storage.is_sane());
            assert_eq!(errors.get(), 1);

            storage
                .slot(4)
                .unwrap()
                .overwrite_unchecked(Some(ResourceStack::of(water(), 5 * BUCKET)));
            assert!(!storage.is_sane());
            assert_eq!(errors.get(), 2);

            storage.slot(4).unwrap().overwrite_unchecked(None);
            assert!(storage.is_sane());
            assert_eq!(errors.get(), 2);
        });
    }

    #[test]
    fn test_empty_storage() {
        let storage = ResourceStorage::<Fluid>::empty();
        assert!(storage.is_empty());
        assert!(storage.slot(0).is_none());
        assert!(storage.expose_all(ResourceFlow::Both, Exposure::Player).is_empty());
        assert!(storage.record().is_empty());
        assert!(storage.is_sane());
    }
}
