//! The resource slot state machine.
//!
//! A slot is either blank or holds a single `(resource, tag, amount)`
//! stack. Every mutation comes in two flavours:
//!
//! - transactional (`insert`, `extract`, ...): snapshots the slot into the
//!   innermost scope of the passed [`Transaction`] before touching it; the
//!   modification counter advances when the outer transaction commits.
//! - immediate (`insert_immediate`, ...): applied and counted at once, with
//!   no way to roll back.
//!
//! Refusals (wrong resource, filtered, full, empty) are not errors; they
//! return `0`.

use std::{cell::RefCell, fmt, rc::Rc};

use rgb_transaction::{Participant, Snapshot, SnapshotJournal, Transaction};

use crate::{
    capacity::{CapacityPolicy, Fixed},
    display::SlotDisplay,
    error::{ResourceError, ResourceResult},
    filter::ResourceFilter,
    mod_count::ModCount,
    record::SlotRecord,
    resource::{Resource, ResourceStack},
};

/// Outcome of [`ResourceSlot::exchange`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exchange<R: Resource> {
    /// The slot now holds the new stack; `previous` is what it held before.
    Accepted { previous: Option<ResourceStack<R>> },
    /// The new stack does not fit or is filtered; nothing changed.
    Rejected,
}

impl<R: Resource> Exchange<R> {
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Tag matching rule for extraction.
#[derive(Clone, Copy)]
enum TagMatch<'t, T> {
    /// The held tag must equal this one; `None` only matches untagged.
    Exact(Option<&'t T>),
    /// Any held tag.
    Any,
}

impl<T: PartialEq> TagMatch<'_, T> {
    fn accepts(self, held: Option<&T>) -> bool {
        match self {
            Self::Exact(tag) => tag == held,
            Self::Any => true,
        }
    }
}

/// A single capacity-bounded, filtered resource cell.
pub struct ResourceSlot<R: Resource> {
    contents: RefCell<Option<ResourceStack<R>>>,
    capacity: u64,
    policy: Rc<dyn CapacityPolicy<R>>,
    filter: ResourceFilter<R>,
    strict_filter: ResourceFilter<R>,
    display: SlotDisplay,
    mod_count: ModCount,
    journal: SnapshotJournal<Option<ResourceStack<R>>>,
}

impl<R: Resource> ResourceSlot<R> {
    /// Start building a slot with base capacity `capacity`.
    #[must_use]
    pub fn builder(capacity: u64) -> SlotBuilder<R> {
        SlotBuilder::new(capacity)
    }

    /// A slot accepting anything, up to `capacity`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::ZeroCapacity`] if `capacity` is zero.
    pub fn with_capacity(capacity: u64) -> ResourceResult<Self> {
        Self::builder(capacity).build()
    }

    // Accessors

    /// The held resource, if any.
    #[must_use]
    pub fn resource(&self) -> Option<R> {
        self.contents
            .borrow()
            .as_ref()
            .map(|held| held.resource.clone())
    }

    /// The held tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<R::Tag> {
        self.contents
            .borrow()
            .as_ref()
            .and_then(|held| held.tag.clone())
    }

    /// The held amount; `0` when blank.
    #[must_use]
    pub fn amount(&self) -> u64 {
        self.contents.borrow().as_ref().map_or(0, |held| held.amount)
    }

    /// A copy of the held stack.
    #[must_use]
    pub fn contents(&self) -> Option<ResourceStack<R>> {
        self.contents.borrow().clone()
    }

    /// Inspect the held stack without cloning it.
    pub fn with_contents<T>(&self, f: impl FnOnce(Option<&ResourceStack<R>>) -> T) -> T {
        f(self.contents.borrow().as_ref())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contents.borrow().is_none()
    }

    /// Whether the slot holds as much of its resource as it can.
    ///
    /// A blank slot is never full.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.contents
            .borrow()
            .as_ref()
            .is_some_and(|held| held.amount >= self.capacity_for(&held.resource))
    }

    /// Whether the slot holds `resource` with exactly `tag`.
    #[must_use]
    pub fn contains(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.contents
            .borrow()
            .as_ref()
            .is_some_and(|held| held.matches(resource, tag))
    }

    /// Whether the slot holds at least `stack`.
    #[must_use]
    pub fn contains_stack(&self, stack: &ResourceStack<R>) -> bool {
        self.contents.borrow().as_ref().is_some_and(|held| {
            held.matches(&stack.resource, stack.tag.as_ref()) && held.amount >= stack.amount
        })
    }

    /// Effective capacity for the held resource; the base capacity when blank.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.contents
            .borrow()
            .as_ref()
            .map_or(self.capacity, |held| self.capacity_for(&held.resource))
    }

    /// Effective capacity if the slot held `resource`.
    #[must_use]
    pub fn capacity_for(&self, resource: &R) -> u64 {
        self.policy.capacity_for(self.capacity, resource)
    }

    /// Capacity the slot was configured with.
    #[must_use]
    pub const fn base_capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub const fn filter(&self) -> &ResourceFilter<R> {
        &self.filter
    }

    /// Filter applied to player-initiated operations, on top of [`filter`](Self::filter).
    #[must_use]
    pub const fn strict_filter(&self) -> &ResourceFilter<R> {
        &self.strict_filter
    }

    #[must_use]
    pub const fn display(&self) -> &SlotDisplay {
        &self.display
    }

    /// Number of committed modifications.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.mod_count.get()
    }

    pub(crate) const fn mod_count(&self) -> &ModCount {
        &self.mod_count
    }

    /// Whether the slot has changes in an open transaction.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.journal.is_active()
    }

    // Pure checks shared by the simulate and mutating paths

    fn insertable(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        if amount == 0 || !self.filter.matches(resource, tag) {
            return 0;
        }

        match self.contents.borrow().as_ref() {
            None => amount.min(self.capacity_for(resource)),
            Some(held) if held.matches(resource, tag) => {
                amount.min(self.capacity_for(resource).saturating_sub(held.amount))
            }
            Some(_) => 0,
        }
    }

    fn extractable(&self, resource: &R, tag: TagMatch<'_, R::Tag>, amount: u64) -> u64 {
        match self.contents.borrow().as_ref() {
            Some(held) if held.resource == *resource && tag.accepts(held.tag.as_ref()) => {
                amount.min(held.amount)
            }
            _ => 0,
        }
    }

    /// Check that `stack` could be held by this slot as is.
    ///
    /// # Errors
    ///
    /// [`ResourceError::ZeroAmount`] for an empty stack,
    /// [`ResourceError::Filtered`] when the filter rejects it and
    /// [`ResourceError::OverCapacity`] when it does not fit.
    pub fn validate(&self, stack: &ResourceStack<R>) -> ResourceResult<()> {
        if stack.amount == 0 {
            return Err(ResourceError::ZeroAmount);
        }
        if !self.filter.matches(&stack.resource, stack.tag.as_ref()) {
            return Err(ResourceError::Filtered);
        }
        let capacity = self.capacity_for(&stack.resource);
        if stack.amount > capacity {
            return Err(ResourceError::OverCapacity {
                amount: stack.amount,
                capacity,
            });
        }
        Ok(())
    }

    fn apply_insert(&self, resource: &R, tag: Option<&R::Tag>, accepted: u64) {
        let mut contents = self.contents.borrow_mut();
        match contents.as_mut() {
            Some(held) => held.amount += accepted,
            None => *contents = Some(ResourceStack::new(resource.clone(), tag.cloned(), accepted)),
        }
    }

    fn apply_extract(&self, removed: u64) {
        let mut contents = self.contents.borrow_mut();
        let drained = contents.as_mut().is_some_and(|held| {
            held.amount -= removed;
            held.amount == 0
        });
        if drained {
            *contents = None;
        }
    }

    pub(crate) fn assert_immediate(&self) {
        if let Some(owner) = self.journal.owner() {
            panic!("immediate mutation of a slot with uncommitted changes in {owner:?}");
        }
    }

    // Simulation

    /// How much of `amount` [`insert`](Self::insert) would accept.
    #[must_use]
    pub fn simulate_insert(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.insertable(resource, tag, amount)
    }

    /// How much of `amount` [`extract`](Self::extract) would remove.
    #[must_use]
    pub fn simulate_extract(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.extractable(resource, TagMatch::Exact(tag), amount)
    }

    /// How much of `amount` [`extract_any`](Self::extract_any) would remove.
    #[must_use]
    pub fn simulate_extract_any(&self, resource: &R, amount: u64) -> u64 {
        self.extractable(resource, TagMatch::Any, amount)
    }

    /// Whether [`exchange`](Self::exchange) would accept `stack`.
    #[must_use]
    pub fn simulate_exchange(&self, stack: &ResourceStack<R>) -> bool {
        self.validate(stack).is_ok()
    }

    /// Whether at least one unit of `resource` with `tag` would be accepted.
    #[must_use]
    pub fn can_insert(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.insertable(resource, tag, 1) > 0
    }

    /// Whether at least one unit of `resource` with exactly `tag` could be extracted.
    #[must_use]
    pub fn can_extract(&self, resource: &R, tag: Option<&R::Tag>) -> bool {
        self.extractable(resource, TagMatch::Exact(tag), 1) > 0
    }

    // Transactional mutation

    /// Insert up to `amount` of `resource` with `tag`.
    ///
    /// Returns the amount accepted: `0` if the filter rejects the resource,
    /// the slot holds something else, or it is full.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn insert<'a>(
        &'a self,
        resource: &R,
        tag: Option<&R::Tag>,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> u64 {
        let accepted = self.insertable(resource, tag, amount);
        if accepted > 0 {
            self.update_snapshots(tx);
            self.apply_insert(resource, tag, accepted);
        }
        accepted
    }

    /// Extract up to `amount` of `resource` carrying exactly `tag`.
    ///
    /// `None` only matches an untagged stack; see
    /// [`extract_any`](Self::extract_any) to ignore tags.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn extract<'a>(
        &'a self,
        resource: &R,
        tag: Option<&R::Tag>,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> u64 {
        self.extract_matching(resource, TagMatch::Exact(tag), amount, tx)
    }

    /// Extract up to `amount` of `resource` whatever its tag.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn extract_any<'a>(&'a self, resource: &R, amount: u64, tx: &mut Transaction<'a>) -> u64 {
        self.extract_matching(resource, TagMatch::Any, amount, tx)
    }

    /// Extract a single unit of `resource`, whatever its tag.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn extract_one<'a>(&'a self, resource: &R, tx: &mut Transaction<'a>) -> bool {
        self.extract_any(resource, 1, tx) == 1
    }

    fn extract_matching<'a>(
        &'a self,
        resource: &R,
        tag: TagMatch<'_, R::Tag>,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> u64 {
        let removed = self.extractable(resource, tag, amount);
        if removed > 0 {
            self.update_snapshots(tx);
            self.apply_extract(removed);
        }
        removed
    }

    /// Extract up to `amount` of whatever the slot holds.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn extract_contents<'a>(
        &'a self,
        amount: u64,
        tx: &mut Transaction<'a>,
    ) -> Option<ResourceStack<R>> {
        let taken = self
            .contents
            .borrow()
            .as_ref()
            .map(|held| held.with_amount(amount.min(held.amount)))
            .filter(|taken| taken.amount > 0)?;

        self.update_snapshots(tx);
        self.apply_extract(taken.amount);
        Some(taken)
    }

    /// Replace the whole contents with `stack`.
    ///
    /// Accepted when `stack` passes the filter and fits the capacity for its
    /// resource, whatever the slot held before.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn exchange<'a>(&'a self, stack: ResourceStack<R>, tx: &mut Transaction<'a>) -> Exchange<R> {
        if self.validate(&stack).is_err() {
            return Exchange::Rejected;
        }
        self.update_snapshots(tx);
        Exchange::Accepted {
            previous: self.contents.replace(Some(stack)),
        }
    }

    /// Overwrite the contents with `stack`.
    ///
    /// # Errors
    ///
    /// Fails without touching the slot if `stack` does not pass
    /// [`validate`](Self::validate).
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn set<'a>(&'a self, stack: ResourceStack<R>, tx: &mut Transaction<'a>) -> ResourceResult<()> {
        self.validate(&stack)?;
        self.update_snapshots(tx);
        *self.contents.borrow_mut() = Some(stack);
        Ok(())
    }

    /// Empty the slot, returning what it held.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted changes in another transaction.
    pub fn clear<'a>(&'a self, tx: &mut Transaction<'a>) -> Option<ResourceStack<R>> {
        if self.is_empty() {
            return None;
        }
        self.update_snapshots(tx);
        self.contents.borrow_mut().take()
    }

    // Immediate mutation

    /// [`insert`](Self::insert) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn insert_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.assert_immediate();
        let accepted = self.insertable(resource, tag, amount);
        if accepted > 0 {
            self.apply_insert(resource, tag, accepted);
            self.mod_count.increment();
        }
        accepted
    }

    /// [`extract`](Self::extract) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn extract_immediate(&self, resource: &R, tag: Option<&R::Tag>, amount: u64) -> u64 {
        self.extract_matching_immediate(resource, TagMatch::Exact(tag), amount)
    }

    /// [`extract_any`](Self::extract_any) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn extract_any_immediate(&self, resource: &R, amount: u64) -> u64 {
        self.extract_matching_immediate(resource, TagMatch::Any, amount)
    }

    fn extract_matching_immediate(&self, resource: &R, tag: TagMatch<'_, R::Tag>, amount: u64) -> u64 {
        self.assert_immediate();
        let removed = self.extractable(resource, tag, amount);
        if removed > 0 {
            self.apply_extract(removed);
            self.mod_count.increment();
        }
        removed
    }

    /// [`set`](Self::set) without a transaction.
    ///
    /// # Errors
    ///
    /// Fails without touching the slot if `stack` does not pass
    /// [`validate`](Self::validate).
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn set_immediate(&self, stack: ResourceStack<R>) -> ResourceResult<()> {
        self.assert_immediate();
        self.validate(&stack)?;
        self.replace_immediate(Some(stack));
        Ok(())
    }

    /// [`clear`](Self::clear) without a transaction.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn clear_immediate(&self) -> Option<ResourceStack<R>> {
        self.assert_immediate();
        let previous = self.contents.borrow_mut().take();
        if previous.is_some() {
            self.mod_count.increment();
        }
        previous
    }

    /// Swap in already validated contents, counting a modification if they differ.
    pub(crate) fn replace_immediate(&self, contents: Option<ResourceStack<R>>) {
        let previous = self.contents.replace(contents);
        if previous != *self.contents.borrow() {
            self.mod_count.increment();
        }
    }

    /// Write `contents` bypassing every check, to exercise the sanity checks.
    #[cfg(test)]
    pub(crate) fn overwrite_unchecked(&self, contents: Option<ResourceStack<R>>) {
        *self.contents.borrow_mut() = contents;
    }

    // Consistency and persistence

    /// Whether the slot upholds its invariants: a held stack is non-empty,
    /// fits the capacity for its resource and passes the filter.
    #[must_use]
    pub fn is_sane(&self) -> bool {
        self.contents.borrow().as_ref().is_none_or(|held| {
            held.amount > 0
                && held.amount <= self.capacity_for(&held.resource)
                && self.filter.matches(&held.resource, held.tag.as_ref())
        })
    }

    /// Persistent form of the contents.
    #[must_use]
    pub fn record(&self) -> SlotRecord<R> {
        SlotRecord::from(self.contents())
    }

    /// Turn `record` into contents this slot may hold.
    ///
    /// # Errors
    ///
    /// See [`validate`](Self::validate).
    pub fn check_record(&self, record: &SlotRecord<R>) -> ResourceResult<Option<ResourceStack<R>>> {
        let contents = record.to_stack();
        if let Some(stack) = &contents {
            self.validate(stack)?;
        }
        Ok(contents)
    }

    /// Load persisted contents, replacing the current ones.
    ///
    /// # Errors
    ///
    /// Fails without touching the slot if the record does not fit it.
    ///
    /// # Panics
    ///
    /// Panics if the slot has uncommitted transactional changes.
    pub fn load_record(&self, record: &SlotRecord<R>) -> ResourceResult<()> {
        self.assert_immediate();
        let contents = self.check_record(record)?;
        self.replace_immediate(contents);
        Ok(())
    }
}

impl<R: Resource> Snapshot for ResourceSlot<R> {
    type Snapshot = Option<ResourceStack<R>>;

    fn create_snapshot(&self) -> Self::Snapshot {
        self.contents.borrow().clone()
    }

    /// Restores contents taken by [`create_snapshot`](Snapshot::create_snapshot).
    ///
    /// Contents this slot could never hold are refused and logged.
    fn read_snapshot(&self, snapshot: Self::Snapshot) {
        if let Some(Err(err)) = snapshot.as_ref().map(|stack| self.validate(stack)) {
            tracing::error!(%err, ?snapshot, "refused slot snapshot");
            return;
        }
        *self.contents.borrow_mut() = snapshot;
    }
}

impl<R: Resource> Participant for ResourceSlot<R> {
    fn journal(&self) -> &SnapshotJournal<Self::Snapshot> {
        &self.journal
    }

    fn on_final_commit(&self) {
        self.mod_count.increment();
    }
}

impl<R: Resource> fmt::Debug for ResourceSlot<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSlot")
            .field("contents", &*self.contents.borrow())
            .field("capacity", &self.capacity())
            .field("filter", &self.filter)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ResourceSlot`].
pub struct SlotBuilder<R: Resource> {
    capacity: u64,
    policy: Rc<dyn CapacityPolicy<R>>,
    filter: ResourceFilter<R>,
    strict_filter: Option<ResourceFilter<R>>,
    display: SlotDisplay,
}

impl<R: Resource> SlotBuilder<R> {
    fn new(capacity: u64) -> Self {
        Self {
            capacity,
            policy: Rc::new(Fixed),
            filter: ResourceFilter::any(),
            strict_filter: None,
            display: SlotDisplay::default(),
        }
    }

    /// Resources the slot accepts at all. Defaults to any.
    #[must_use]
    pub fn filter(mut self, filter: ResourceFilter<R>) -> Self {
        self.filter = filter;
        self
    }

    /// Resources a player may insert by hand. Defaults to the slot filter.
    #[must_use]
    pub fn strict_filter(mut self, filter: ResourceFilter<R>) -> Self {
        self.strict_filter = Some(filter);
        self
    }

    /// Capacity strategy. Defaults to [`Fixed`].
    #[must_use]
    pub fn policy(mut self, policy: Rc<dyn CapacityPolicy<R>>) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn display(mut self, display: SlotDisplay) -> Self {
        self.display = display;
        self
    }

    /// # Errors
    ///
    /// [`ResourceError::ZeroCapacity`] if the base capacity is zero.
    pub fn build(self) -> ResourceResult<ResourceSlot<R>> {
        if self.capacity == 0 {
            return Err(ResourceError::ZeroCapacity);
        }

        let strict_filter = self.strict_filter.unwrap_or_else(|| self.filter.clone());
        Ok(ResourceSlot {
            contents: RefCell::new(None),
            capacity: self.capacity,
            policy: self.policy,
            filter: self.filter,
            strict_filter,
            display: self.display,
            mod_count: ModCount::new(),
            journal: SnapshotJournal::new(),
        })
    }
}

impl<R: Resource> fmt::Debug for SlotBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotBuilder")
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}
