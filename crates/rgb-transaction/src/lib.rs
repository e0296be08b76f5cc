//! Nested speculative transactions for single-threaded simulation state.
//!
//! A [`Transaction`] is not concurrency control. It lets tick logic attempt a
//! multi-step mutation (extract from one slot, insert into another) and throw
//! the whole attempt away if any step falls short, without partial state ever
//! escaping the transaction boundary.
//!
//! The coordinator only knows about *close callbacks*. State owners take part
//! through the narrow [`Participant`] capability: they describe how to take and
//! restore a [`Snapshot`] of themselves and keep a [`SnapshotJournal`] next to
//! their state. Everything else (one snapshot per nesting depth, handing
//! snapshots to the parent on nested commit, restoring on abort) is provided.
//!
//! # Lifecycle
//!
//! ```text
//! open() ──► depth 0 ──nested()──► depth 1 ──nested()──► depth 2
//!              │                     │                     │
//!          commit/abort          commit/abort          commit/abort
//!              │                     │                     │
//!     final commit or         snapshot handed to     snapshot handed to
//!     restore snapshot        depth 0 or restored    depth 1 or restored
//! ```
//!
//! Dropping a transaction or nested scope without committing aborts it.
//!
//! # Usage
//!
//! ```ignore
//! let mut tx = Transaction::open();
//! let moved = source.extract(&water, None, BUCKET, &mut tx);
//! if target.insert(&water, None, moved, &mut tx) == moved {
//!     tx.commit();
//! } // otherwise dropped: both slots roll back
//! ```

mod participant;
mod transaction;

pub use participant::{CloseCallback, Participant, Snapshot, SnapshotJournal};
pub use transaction::{NestedTransaction, Outcome, Transaction, TransactionId};
