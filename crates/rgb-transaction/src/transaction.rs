//! The transaction coordinator.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    sync::atomic::{AtomicU64, Ordering},
};

use smallvec::SmallVec;

use crate::participant::CloseCallback;

/// Global counter for generating unique transaction IDs.
static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier of an outer transaction.
///
/// Nested scopes share the identifier of the transaction they were opened on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

/// How a transaction scope was closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Changes are kept (and handed to the parent scope, if any).
    Committed,
    /// Changes are rolled back to the state at the start of the scope.
    Aborted,
}

impl Outcome {
    /// Whether the scope was committed.
    #[must_use]
    pub const fn was_committed(self) -> bool {
        matches!(self, Self::Committed)
    }

    /// Whether the scope was aborted.
    #[must_use]
    pub const fn was_aborted(self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Participants enlisted at a single nesting depth.
type Frame<'a> = SmallVec<[&'a dyn CloseCallback; 8]>;

/// An open transaction.
///
/// The lifetime `'a` bounds every participant enlisted in the transaction:
/// state owners must outlive the transaction that may roll them back.
///
/// Closing consumes the transaction. Dropping it without calling
/// [`commit`](Self::commit) aborts every open scope.
pub struct Transaction<'a> {
    id: TransactionId,
    /// Participants of the outer scope (depth 0).
    root: Frame<'a>,
    /// Participants of each open nested scope, innermost last.
    nested: Vec<Frame<'a>>,
    closed: bool,
}

impl<'a> Transaction<'a> {
    /// Open a new outer transaction.
    #[must_use]
    pub fn open() -> Self {
        Self {
            id: TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed)),
            root: Frame::new(),
            nested: Vec::new(),
            closed: false,
        }
    }

    /// Run `body` in a fresh transaction.
    ///
    /// Commits when `body` returns `Ok`, aborts when it returns `Err`.
    pub fn run<T, E>(body: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let mut tx = Self::open();
        match body(&mut tx) {
            Ok(value) => {
                tx.commit();
                Ok(value)
            }
            Err(err) => {
                tx.abort();
                Err(err)
            }
        }
    }

    /// The identifier shared by this transaction and its nested scopes.
    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    /// Current nesting depth: 0 for the outer scope.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nested.len()
    }

    /// Number of participants enlisted in the innermost open scope.
    #[must_use]
    pub fn enlisted(&self) -> usize {
        self.nested.last().unwrap_or(&self.root).len()
    }

    /// Register `participant` to be notified when the innermost open scope closes.
    ///
    /// Participants normally call this through
    /// [`Participant::update_snapshots`](crate::Participant::update_snapshots),
    /// which guarantees a single registration per depth.
    pub fn enlist(&mut self, participant: &'a dyn CloseCallback) {
        self.current_frame().push(participant);
    }

    /// Open a nested scope.
    ///
    /// The returned guard dereferences to this transaction, so it can be
    /// passed wherever a `&mut Transaction` is expected.
    pub fn nested(&mut self) -> NestedTransaction<'_, 'a> {
        self.nested.push(Frame::new());
        let level = self.nested.len();
        NestedTransaction {
            tx: self,
            level,
            closed: false,
        }
    }

    /// Commit the transaction, making every change final.
    pub fn commit(mut self) {
        self.close_all(Outcome::Committed);
    }

    /// Abort the transaction, rolling every participant back.
    pub fn abort(mut self) {
        self.close_all(Outcome::Aborted);
    }

    fn current_frame(&mut self) -> &mut Frame<'a> {
        self.nested.last_mut().unwrap_or(&mut self.root)
    }

    /// Close the innermost open scope.
    fn close_top(&mut self, outcome: Outcome) {
        let depth = self.depth();
        let frame = self
            .nested
            .pop()
            .unwrap_or_else(|| std::mem::take(&mut self.root));

        tracing::trace!(
            id = self.id.0,
            depth,
            ?outcome,
            participants = frame.len(),
            "closing transaction scope"
        );

        for participant in frame.into_iter().rev() {
            if participant.on_close(depth, outcome) {
                self.current_frame().push(participant);
            }
        }
    }

    /// Close nested scopes down to (and excluding) `level`, aborting them.
    ///
    /// Only reachable when a nested guard was leaked with `mem::forget`.
    fn unwind_to(&mut self, level: usize) {
        while self.nested.len() > level {
            self.close_top(Outcome::Aborted);
        }
    }

    fn close_all(&mut self, outcome: Outcome) {
        self.unwind_to(0);
        self.close_top(outcome);
        self.closed = true;
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.close_all(Outcome::Aborted);
        }
    }
}

impl fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("depth", &self.depth())
            .field("enlisted", &self.enlisted())
            .finish()
    }
}

/// A nested scope of a [`Transaction`].
///
/// Dropping the guard without calling [`commit`](Self::commit) aborts the
/// scope; the enclosing transaction stays open either way.
pub struct NestedTransaction<'t, 'a> {
    tx: &'t mut Transaction<'a>,
    /// Number of nested frames open when this scope was created (its own included).
    level: usize,
    closed: bool,
}

impl NestedTransaction<'_, '_> {
    /// Commit this scope into its parent.
    pub fn commit(mut self) {
        self.close(Outcome::Committed);
    }

    /// Abort this scope, restoring the state at the time it was opened.
    pub fn abort(mut self) {
        self.close(Outcome::Aborted);
    }

    fn close(&mut self, outcome: Outcome) {
        self.tx.unwind_to(self.level);
        self.tx.close_top(outcome);
        self.closed = true;
    }
}

impl<'a> Deref for NestedTransaction<'_, 'a> {
    type Target = Transaction<'a>;

    fn deref(&self) -> &Self::Target {
        self.tx
    }
}

impl DerefMut for NestedTransaction<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.tx
    }
}

impl Drop for NestedTransaction<'_, '_> {
    fn drop(&mut self) {
        if !self.closed {
            self.close(Outcome::Aborted);
        }
    }
}

impl fmt::Debug for NestedTransaction<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedTransaction")
            .field("id", &self.tx.id)
            .field("depth", &self.level)
            .finish()
    }
}
