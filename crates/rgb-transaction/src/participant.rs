//! Snapshot-based participation in transactions.
//!
//! State owners compose a [`SnapshotJournal`] into their state and implement
//! [`Snapshot`] + [`Participant`]. The blanket [`CloseCallback`] impl then
//! takes care of rollback and of handing snapshots between nesting depths.

use std::{
    cell::{Cell, RefCell},
    fmt,
};

use crate::transaction::{Outcome, Transaction, TransactionId};

/// Capability to capture and restore a value's observable state.
pub trait Snapshot {
    /// Captured state.
    type Snapshot;

    /// Capture the current state.
    fn create_snapshot(&self) -> Self::Snapshot;

    /// Restore a previously captured state verbatim.
    fn read_snapshot(&self, snapshot: Self::Snapshot);
}

/// Callback invoked by the coordinator when a scope closes.
pub trait CloseCallback {
    /// Notify that the scope at `depth` closed with `outcome`.
    ///
    /// Returns `true` when the callback must be enlisted in the parent scope
    /// as well (only meaningful for nested commits).
    fn on_close(&self, depth: usize, outcome: Outcome) -> bool;
}

/// A [`Snapshot`] owner that takes part in transactions.
pub trait Participant: Snapshot {
    /// The journal holding this participant's per-depth snapshots.
    fn journal(&self) -> &SnapshotJournal<Self::Snapshot>;

    /// Called once the outer transaction commits with changes from this participant.
    fn on_final_commit(&self) {}

    /// Snapshot the current state for the innermost scope of `tx`, unless
    /// that scope already holds one.
    ///
    /// Must be called before every mutation that should be rolled back.
    ///
    /// # Panics
    ///
    /// Panics if this participant already has uncommitted changes in a
    /// different open transaction.
    fn update_snapshots<'a>(&'a self, tx: &mut Transaction<'a>)
    where
        Self: Sized,
    {
        if self
            .journal()
            .record(tx.id(), tx.depth(), || self.create_snapshot())
        {
            tx.enlist(self);
        }
    }
}

impl<P: Participant> CloseCallback for P {
    fn on_close(&self, depth: usize, outcome: Outcome) -> bool {
        let journal = self.journal();
        let Some(snapshot) = journal.take(depth) else {
            return false;
        };

        let enlist_parent = match outcome {
            Outcome::Aborted => {
                self.read_snapshot(snapshot);
                false
            }
            Outcome::Committed if depth == 0 => {
                drop(snapshot);
                self.on_final_commit();
                false
            }
            Outcome::Committed => journal.promote(depth - 1, snapshot),
        };

        journal.release_if_idle();
        enlist_parent
    }
}

/// Per-depth snapshot storage owned by a participant.
///
/// Index `n` holds the state captured before the first mutation at nesting
/// depth `n`, or `None` if the participant was not touched at that depth.
pub struct SnapshotJournal<S> {
    owner: Cell<Option<TransactionId>>,
    snapshots: RefCell<Vec<Option<S>>>,
}

impl<S> SnapshotJournal<S> {
    /// Create an empty journal.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            owner: Cell::new(None),
            snapshots: RefCell::new(Vec::new()),
        }
    }

    /// Whether the owning participant has uncommitted transactional changes.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.owner.get().is_some()
    }

    /// The transaction holding uncommitted changes, if any.
    #[must_use]
    pub fn owner(&self) -> Option<TransactionId> {
        self.owner.get()
    }

    /// Record a snapshot for `depth` unless one exists.
    ///
    /// Returns `true` when a snapshot was taken, meaning the participant must
    /// enlist in the scope at `depth`.
    fn record(&self, tx: TransactionId, depth: usize, capture: impl FnOnce() -> S) -> bool {
        if let Some(owner) = self.owner.get() {
            assert_eq!(
                owner, tx,
                "participant mutated in {tx:?} while {owner:?} holds uncommitted changes"
            );
        }

        let mut snapshots = self.snapshots.borrow_mut();
        if snapshots.len() <= depth {
            snapshots.resize_with(depth + 1, || None);
        }
        if snapshots[depth].is_some() {
            return false;
        }

        snapshots[depth] = Some(capture());
        self.owner.set(Some(tx));
        true
    }

    /// Take the snapshot recorded for `depth`.
    fn take(&self, depth: usize) -> Option<S> {
        let mut snapshots = self.snapshots.borrow_mut();
        let taken = snapshots.get_mut(depth).and_then(Option::take);
        while matches!(snapshots.last(), Some(None)) {
            snapshots.pop();
        }
        taken
    }

    /// Hand a committed snapshot to `depth`.
    ///
    /// Returns `true` if `depth` had no snapshot yet, in which case the
    /// participant must enlist there. Otherwise the older snapshot wins.
    fn promote(&self, depth: usize, snapshot: S) -> bool {
        let mut snapshots = self.snapshots.borrow_mut();
        if snapshots.len() <= depth {
            snapshots.resize_with(depth + 1, || None);
        }
        if snapshots[depth].is_some() {
            return false;
        }
        snapshots[depth] = Some(snapshot);
        true
    }

    fn release_if_idle(&self) {
        if self.snapshots.borrow().iter().all(Option::is_none) {
            self.owner.set(None);
        }
    }
}

impl<S> Default for SnapshotJournal<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for SnapshotJournal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depths = self
            .snapshots
            .borrow()
            .iter()
            .filter(|snapshot| snapshot.is_some())
            .count();
        f.debug_struct("SnapshotJournal")
            .field("owner", &self.owner.get())
            .field("depths", &depths)
            .finish()
    }
}
