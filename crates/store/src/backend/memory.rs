//! In-memory storage backend for testing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{Snapshot, StorageBackend};
use crate::error::{Error, Result};

/// In-memory storage backend for testing.
///
/// All data is stored in memory and lost when the backend is dropped.
/// Persist failures can be injected with [`set_fail_persist`](Self::set_fail_persist)
/// to exercise the store-unavailable path.
#[derive(Default)]
pub struct InMemoryBackend {
    /// The last persisted snapshot.
    persisted: RwLock<Snapshot>,
    /// Number of successful persists.
    persist_count: AtomicU64,
    /// When set, every persist fails with `Error::Unavailable`.
    fail_persist: AtomicBool,
}

impl InMemoryBackend {
    /// Create a new, empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that starts out holding `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self { persisted: RwLock::new(snapshot), ..Self::default() }
    }

    /// Makes subsequent persists fail (or succeed again).
    pub fn set_fail_persist(&self, fail: bool) {
        self.fail_persist.store(fail, Ordering::SeqCst);
    }

    /// Number of snapshots persisted so far.
    pub fn persist_count(&self) -> u64 {
        self.persist_count.load(Ordering::SeqCst)
    }
}

impl StorageBackend for InMemoryBackend {
    fn load(&self) -> Result<Snapshot> {
        Ok(self.persisted.read().clone())
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        if self.fail_persist.load(Ordering::SeqCst) {
            return Err(Error::Unavailable { reason: "persist failure injected".to_string() });
        }
        *self.persisted.write() = snapshot.clone();
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
