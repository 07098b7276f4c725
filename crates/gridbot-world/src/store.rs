//! The current world-state snapshot, replaced atomically.
//!
//! The store holds exactly one snapshot behind a single mutex. Readers clone
//! the `Arc` under the lock and read the snapshot after releasing it, so a
//! reader never blocks the next replace for longer than a pointer copy, and
//! no reader can observe a half-written snapshot.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::snapshot::WorldState;

/// Holder of the current snapshot plus a replace counter.
#[derive(Debug)]
pub struct WorldStateStore {
    current: Mutex<Slot>,
}

#[derive(Debug)]
struct Slot {
    snapshot: Arc<WorldState>,
    revision: u64,
}

impl WorldStateStore {
    /// Create a store holding `initial` at revision 0.
    pub fn new(initial: WorldState) -> Self {
        Self {
            current: Mutex::new(Slot {
                snapshot: Arc::new(initial),
                revision: 0,
            }),
        }
    }

    /// Install `snapshot` as the current one. Returns the new revision.
    ///
    /// The snapshot is visible to every reader once this returns.
    pub fn replace(&self, snapshot: WorldState) -> u64 {
        let snapshot = Arc::new(snapshot);
        let mut slot = self.lock();
        slot.snapshot = snapshot;
        slot.revision = slot.revision.saturating_add(1);
        let revision = slot.revision;
        drop(slot);
        debug!(revision, "world state replaced");
        revision
    }

    /// The latest installed snapshot.
    pub fn current_snapshot(&self) -> Arc<WorldState> {
        Arc::clone(&self.lock().snapshot)
    }

    /// Number of replaces since construction.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    // The slot is only ever assigned whole values, so a panic while holding
    // the lock cannot leave it inconsistent.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
