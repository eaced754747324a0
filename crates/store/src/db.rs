//! Database and transaction management for the record store.
//!
//! Provides atomic transactions over one flat, ordered key space. Uses a
//! single-writer model: a write transaction holds the write lock from
//! [`Database::write`] until it is committed, aborted or dropped, so a
//! check-then-act sequence inside one transaction never interleaves with
//! another writer.
//!
//! # Example
//!
//! ```no_run
//! use ledger_records_store::{Database, StateReader, StateWriter};
//!
//! let db = Database::open_in_memory()?;
//!
//! // Write transaction
//! {
//!     let mut txn = db.write();
//!     txn.put("party/Democrats", b"{}".to_vec())?;
//!     txn.commit()?;
//! }
//!
//! // Read transaction
//! {
//!     let txn = db.read();
//!     assert!(txn.contains("party/Democrats")?);
//! }
//! # Ok::<(), ledger_records_store::Error>(())
//! ```

use std::{
    cmp::Ordering,
    collections::{BTreeMap, btree_map},
    iter::Peekable,
    ops::Bound,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, MutexGuard};

use crate::{
    backend::{FileBackend, InMemoryBackend, Snapshot, StorageBackend},
    error::{Error, Result},
};

/// Ordered `(key, value)` pairs produced by [`StateReader::scan`].
pub type ScanIter<'a> = Box<dyn Iterator<Item = (String, Vec<u8>)> + 'a>;

/// Read access to the world state.
pub trait StateReader {
    /// Returns the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Checks if a key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterates keys in `[start, end)` in ascending byte order.
    ///
    /// An empty `end` means the range is unbounded above. The iterator is
    /// lazy: entries are produced as it is advanced.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn scan(&self, start: &str, end: &str) -> Result<ScanIter<'_>>;
}

/// Write access to the world state.
pub trait StateWriter: StateReader {
    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be buffered.
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Removes `key`. Returns whether it was present.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn delete(&mut self, key: &str) -> Result<bool>;

    /// Writes `value` under `key` only if the key is absent. Returns whether
    /// the write happened.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn put_if_absent(&mut self, key: &str, value: Vec<u8>) -> Result<bool> {
        if self.contains(key)? {
            return Ok(false);
        }
        self.put(key, value)?;
        Ok(true)
    }
}

/// Database configuration options.
#[derive(Debug, Clone, bon::Builder)]
pub struct DatabaseConfig {
    /// Whether to sync on every commit (default true for durability).
    #[builder(default = true)]
    pub sync_on_commit: bool,
    /// Whether opening a locked data file blocks until the lock is released
    /// (default false: fail with [`Error::Locked`]).
    #[builder(default = false)]
    pub wait_for_lock: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { sync_on_commit: true, wait_for_lock: false }
    }
}

/// The main database handle.
///
/// Generic over [`StorageBackend`]: use [`Database<FileBackend>`] for durable
/// state and [`Database<InMemoryBackend>`] for testing.
///
/// Thread-safe with interior mutability. Supports concurrent reads and
/// exclusive writes (single-writer model). Readers capture the committed
/// snapshot through an `ArcSwap` and never block; a commit publishes the new
/// snapshot with a single atomic pointer swap.
pub struct Database<B: StorageBackend> {
    /// Storage backend (file or memory).
    backend: B,
    /// Current committed state (atomically swapped on commit).
    committed_state: ArcSwap<Snapshot>,
    /// Ensures only one write transaction at a time.
    write_lock: Mutex<()>,
    /// Commits that published a new snapshot.
    commits: AtomicU64,
    /// Write transactions that ended without committing.
    aborts: AtomicU64,
}

impl Database<FileBackend> {
    /// Opens the database stored at `path`, creating it on first commit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file exists but cannot be read.
    /// Returns [`Error::Locked`] if another handle has the file open.
    /// Returns a corruption error if the file fails snapshot verification.
    ///
    /// ```no_run
    /// use ledger_records_store::Database;
    ///
    /// let db = Database::open("/var/lib/ledger-records/state.db")?;
    /// let txn = db.read();
    /// # Ok::<(), ledger_records_store::Error>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, DatabaseConfig::default())
    }

    /// Opens the database stored at `path` with custom configuration.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: DatabaseConfig) -> Result<Self> {
        Self::from_backend(FileBackend::with_options(
            path,
            config.sync_on_commit,
            config.wait_for_lock,
        )?)
    }
}

impl Database<InMemoryBackend> {
    /// Creates a new in-memory database.
    ///
    /// Useful for testing and ephemeral workloads. Data is lost on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if backend initialization fails.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_backend(InMemoryBackend::new())
    }
}

impl<B: StorageBackend> Database<B> {
    /// Opens a database over an existing backend, loading its committed state.
    ///
    /// # Errors
    ///
    /// Returns any error from [`StorageBackend::load`].
    pub fn from_backend(backend: B) -> Result<Self> {
        let snapshot = backend.load()?;
        tracing::debug!(
            version = snapshot.version,
            entries = snapshot.entries.len(),
            "Loaded committed state"
        );
        Ok(Self {
            backend,
            committed_state: ArcSwap::from_pointee(snapshot),
            write_lock: Mutex::new(()),
            commits: AtomicU64::new(0),
            aborts: AtomicU64::new(0),
        })
    }

    /// Returns the storage backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Begin a read-only transaction.
    ///
    /// The transaction sees the state as of the last commit before this call,
    /// unaffected by commits that happen while it is open.
    pub fn read(&self) -> ReadTransaction {
        ReadTransaction { snapshot: self.committed_state.load_full() }
    }

    /// Begin a write transaction.
    ///
    /// Blocks until any other write transaction has finished. Read
    /// transactions run concurrently and never observe uncommitted writes.
    pub fn write(&self) -> WriteTransaction<'_, B> {
        let write_guard = self.write_lock.lock();
        let base = self.committed_state.load_full();

        WriteTransaction {
            db: self,
            base,
            pending: BTreeMap::new(),
            finished: false,
            _write_guard: write_guard,
        }
    }

    /// Runs `f` inside one write transaction.
    ///
    /// Commits if `f` returns `Ok`; discards every write `f` made if it
    /// returns `Err` or if the commit itself fails.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or the commit error converted into `E`.
    pub fn execute<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut WriteTransaction<'_, B>) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut txn = self.write();
        match f(&mut txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            },
            Err(e) => {
                txn.abort();
                Err(e)
            },
        }
    }

    /// Returns database statistics.
    pub fn stats(&self) -> DatabaseStats {
        let snapshot = self.committed_state.load();
        DatabaseStats {
            version: snapshot.version,
            entries: snapshot.entries.len(),
            commits: self.commits.load(AtomicOrdering::Relaxed),
            aborts: self.aborts.load(AtomicOrdering::Relaxed),
        }
    }
}

/// Database statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Version of the committed snapshot.
    pub version: u64,
    /// Number of keys in the committed snapshot.
    pub entries: usize,
    /// Commits since this handle was opened.
    pub commits: u64,
    /// Write transactions discarded since this handle was opened.
    pub aborts: u64,
}

/// A read-only transaction.
///
/// Holds an immutable snapshot captured at creation. No locks are held.
#[derive(Debug, Clone)]
pub struct ReadTransaction {
    snapshot: Arc<Snapshot>,
}

impl ReadTransaction {
    /// Version of the snapshot this transaction reads.
    pub fn version(&self) -> u64 {
        self.snapshot.version
    }
}

impl StateReader for ReadTransaction {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.snapshot.entries.get(key).cloned())
    }

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.snapshot.entries.contains_key(key))
    }

    fn scan(&self, start: &str, end: &str) -> Result<ScanIter<'_>> {
        match key_range(start, end) {
            Some(range) => Ok(Box::new(
                self.snapshot.entries.range::<str, _>(range).map(|(k, v)| (k.clone(), v.clone())),
            )),
            None => Ok(Box::new(std::iter::empty())),
        }
    }
}

/// A read-write transaction.
///
/// Writes are buffered in the transaction and are visible to its own reads
/// (read-your-writes). On [`commit`](Self::commit) the buffered writes are
/// applied to the committed snapshot, persisted through the backend, and the
/// new snapshot is published atomically.
///
/// **Drop behavior:** If a `WriteTransaction` is dropped without calling
/// `commit()` or `abort()`, all buffered writes are discarded. The database
/// state remains unchanged.
pub struct WriteTransaction<'db, B: StorageBackend> {
    db: &'db Database<B>,
    /// Committed state when the transaction began.
    base: Arc<Snapshot>,
    /// Buffered writes; `None` marks a deletion.
    pending: BTreeMap<String, Option<Vec<u8>>>,
    /// Whether the transaction has been committed or aborted.
    finished: bool,
    /// Guard to ensure only one write transaction at a time.
    _write_guard: MutexGuard<'db, ()>,
}

impl<B: StorageBackend> WriteTransaction<'_, B> {
    /// Number of buffered writes (puts and deletes).
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Commit the transaction.
    ///
    /// A transaction with no buffered writes commits without touching the
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the new snapshot cannot be persisted. The
    /// committed state is then unchanged.
    pub fn commit(mut self) -> Result<()> {
        if self.pending.is_empty() {
            self.finished = true;
            return Ok(());
        }

        let mut next =
            Snapshot { version: self.base.version + 1, entries: self.base.entries.clone() };
        let mut puts = 0usize;
        let mut deletes = 0usize;
        for (key, value) in std::mem::take(&mut self.pending) {
            match value {
                Some(value) => {
                    next.entries.insert(key, value);
                    puts += 1;
                },
                None => {
                    next.entries.remove(&key);
                    deletes += 1;
                },
            }
        }

        if let Err(e) = self.db.backend.persist(&next) {
            tracing::warn!(version = next.version, error = %e, "Failed to persist commit");
            return Err(e);
        }

        let version = next.version;
        self.db.committed_state.store(Arc::new(next));
        self.db.commits.fetch_add(1, AtomicOrdering::Relaxed);
        self.finished = true;

        tracing::debug!(version, puts, deletes, "Committed write transaction");
        Ok(())
    }

    /// Aborts the transaction (discard all changes).
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if !self.pending.is_empty() {
            tracing::debug!(writes = self.pending.len(), "Discarding uncommitted writes");
        }
        self.pending.clear();
        self.db.aborts.fetch_add(1, AtomicOrdering::Relaxed);
        self.finished = true;
    }
}

impl<B: StorageBackend> StateReader for WriteTransaction<'_, B> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => Ok(self.base.entries.get(key).cloned()),
        }
    }

    fn scan(&self, start: &str, end: &str) -> Result<ScanIter<'_>> {
        let Some(range) = key_range(start, end) else {
            return Ok(Box::new(std::iter::empty()));
        };
        Ok(Box::new(MergedScan {
            base: self.base.entries.range::<str, _>(range).peekable(),
            pending: self.pending.range::<str, _>(range).peekable(),
        }))
    }
}

impl<B: StorageBackend> StateWriter for WriteTransaction<'_, B> {
    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<()> {
        self.pending.insert(key.to_string(), Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<bool> {
        let existed = self.contains(key)?;
        if existed {
            self.pending.insert(key.to_string(), None);
        }
        Ok(existed)
    }
}

impl<B: StorageBackend> Drop for WriteTransaction<'_, B> {
    fn drop(&mut self) {
        if !self.finished {
            self.discard();
        }
    }
}

/// Converts scan arguments to `BTreeMap` range bounds.
///
/// Returns `None` for an inverted range, which `BTreeMap::range` would
/// reject with a panic.
fn key_range<'a>(start: &'a str, end: &'a str) -> Option<(Bound<&'a str>, Bound<&'a str>)> {
    if end.is_empty() {
        return Some((Bound::Included(start), Bound::Unbounded));
    }
    if start > end {
        return None;
    }
    Some((Bound::Included(start), Bound::Excluded(end)))
}

/// Merges the committed entries with a transaction's buffered writes, in key
/// order. Buffered writes shadow committed entries; buffered deletions hide
/// them.
struct MergedScan<'a> {
    base: Peekable<btree_map::Range<'a, String, Vec<u8>>>,
    pending: Peekable<btree_map::Range<'a, String, Option<Vec<u8>>>>,
}

impl Iterator for MergedScan<'_> {
    type Item = (String, Vec<u8>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let order = match (self.base.peek(), self.pending.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((base_key, _)), Some((pending_key, _))) => base_key.cmp(pending_key),
            };

            if order == Ordering::Less {
                let (key, value) = self.base.next()?;
                return Some((key.clone(), value.clone()));
            }
            if order == Ordering::Equal {
                self.base.next();
            }
            let (key, value) = self.pending.next()?;
            if let Some(value) = value {
                return Some((key.clone(), value.clone()));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]
mod tests {
    use std::thread;

    use super::*;

    fn keys(iter: ScanIter<'_>) -> Vec<String> {
        iter.map(|(k, _)| k).collect()
    }

    fn seeded() -> Database<InMemoryBackend> {
        let db = Database::open_in_memory().unwrap();
        let mut txn = db.write();
        for key in ["a/1", "a/2", "a/3", "b/1"] {
            txn.put(key, key.as_bytes().to_vec()).unwrap();
        }
        txn.commit().unwrap();
        db
    }

    // =========================================================================
    // Read transactions
    // =========================================================================

    #[test]
    fn test_empty_database() {
        let db = Database::open_in_memory().unwrap();
        let txn = db.read();
        assert_eq!(txn.get("missing").unwrap(), None);
        assert!(!txn.contains("missing").unwrap());
        assert_eq!(keys(txn.scan("", "").unwrap()), Vec::<String>::new());
        assert_eq!(txn.version(), 0);
    }

    #[test]
    fn test_scan_is_bounded_and_ordered() {
        let db = seeded();
        let txn = db.read();
        assert_eq!(keys(txn.scan("a/", "a0").unwrap()), vec!["a/1", "a/2", "a/3"]);
        assert_eq!(keys(txn.scan("a/2", "").unwrap()), vec!["a/2", "a/3", "b/1"]);
        assert_eq!(keys(txn.scan("b/", "b0").unwrap()), vec!["b/1"]);
    }

    #[test]
    fn test_inverted_scan_is_empty() {
        let db = seeded();
        let txn = db.read();
        assert_eq!(keys(txn.scan("z", "a").unwrap()), Vec::<String>::new());
        assert_eq!(keys(txn.scan("a/1", "a/1").unwrap()), Vec::<String>::new());
    }

    #[test]
    fn test_read_snapshot_isolation() {
        let db = seeded();
        let before = db.read();

        let mut txn = db.write();
        txn.put("a/4", vec![4]).unwrap();
        assert!(txn.delete("a/1").unwrap());
        txn.commit().unwrap();

        assert!(before.contains("a/1").unwrap());
        assert!(!before.contains("a/4").unwrap());

        let after = db.read();
        assert!(!after.contains("a/1").unwrap());
        assert_eq!(after.get("a/4").unwrap(), Some(vec![4]));
        assert_eq!(after.version(), before.version() + 1);
    }

    // =========================================================================
    // Write transactions
    // =========================================================================

    #[test]
    fn test_read_your_writes() {
        let db = seeded();
        let mut txn = db.write();
        txn.put("a/2", b"new".to_vec()).unwrap();
        txn.put("c/1", b"c".to_vec()).unwrap();
        txn.delete("a/1").unwrap();

        assert_eq!(txn.get("a/2").unwrap(), Some(b"new".to_vec()));
        assert_eq!(txn.get("c/1").unwrap(), Some(b"c".to_vec()));
        assert_eq!(txn.get("a/1").unwrap(), None);
        assert!(!txn.contains("a/1").unwrap());
    }

    #[test]
    fn test_write_scan_merges_buffered_writes() {
        let db = seeded();
        let mut txn = db.write();
        txn.put("a/0", vec![0]).unwrap();
        txn.put("a/2", b"changed".to_vec()).unwrap();
        txn.delete("a/3").unwrap();
        txn.put("a/9", vec![9]).unwrap();

        let entries: Vec<_> = txn.scan("a/", "a0").unwrap().collect();
        let scanned: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(scanned, vec!["a/0", "a/1", "a/2", "a/9"]);
        assert_eq!(entries[2].1, b"changed".to_vec());
    }

    #[test]
    fn test_delete_absent_key() {
        let db = seeded();
        let mut txn = db.write();
        assert!(!txn.delete("nope").unwrap());
        assert_eq!(txn.pending_writes(), 0);
    }

    #[test]
    fn test_put_if_absent() {
        let db = seeded();
        let mut txn = db.write();
        assert!(!txn.put_if_absent("a/1", b"other".to_vec()).unwrap());
        assert_eq!(txn.get("a/1").unwrap(), Some(b"a/1".to_vec()));
        assert!(txn.put_if_absent("a/7", vec![7]).unwrap());
        assert!(!txn.put_if_absent("a/7", vec![8]).unwrap());
        assert_eq!(txn.get("a/7").unwrap(), Some(vec![7]));
    }

    #[test]
    fn test_drop_discards_writes() {
        let db = seeded();
        {
            let mut txn = db.write();
            txn.put("a/5", vec![5]).unwrap();
        }
        assert!(!db.read().contains("a/5").unwrap());
        assert_eq!(db.stats().aborts, 1);
    }

    #[test]
    fn test_abort_discards_writes() {
        let db = seeded();
        let mut txn = db.write();
        txn.delete("a/1").unwrap();
        txn.abort();
        assert!(db.read().contains("a/1").unwrap());
    }

    #[test]
    fn test_empty_commit_does_not_persist() {
        let db = seeded();
        let persisted = db.backend().persist_count();
        db.write().commit().unwrap();
        assert_eq!(db.backend().persist_count(), persisted);
        assert_eq!(db.read().version(), 1);
    }

    #[test]
    fn test_failed_persist_leaves_state_unchanged() {
        let db = seeded();
        db.backend().set_fail_persist(true);

        let mut txn = db.write();
        txn.put("a/6", vec![6]).unwrap();
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, Error::Unavailable { .. }));

        assert!(!db.read().contains("a/6").unwrap());
        assert_eq!(db.stats().version, 1);

        // The write lock was released with the failed transaction
        db.backend().set_fail_persist(false);
        let mut txn = db.write();
        txn.put("a/6", vec![6]).unwrap();
        txn.commit().unwrap();
        assert!(db.read().contains("a/6").unwrap());
    }

    // =========================================================================
    // execute
    // =========================================================================

    #[test]
    fn test_execute_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        let value = db
            .execute(|txn| -> Result<u32> {
                txn.put("k/1", vec![1])?;
                Ok(7)
            })
            .unwrap();
        assert_eq!(value, 7);
        assert!(db.read().contains("k/1").unwrap());
    }

    #[test]
    fn test_execute_discards_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result = db.execute(|txn| -> Result<()> {
            txn.put("k/1", vec![1])?;
            txn.put("k/2", vec![2])?;
            Err(Error::Corrupted { reason: "second step failed".to_string() })
        });
        assert!(result.is_err());
        let txn = db.read();
        assert!(!txn.contains("k/1").unwrap());
        assert!(!txn.contains("k/2").unwrap());
    }

    #[test]
    fn test_concurrent_writers_serialize() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let threads: u64 = 8;
        let per_thread: u64 = 25;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        db.execute(|txn| -> Result<()> {
                            let current = txn
                                .get("counter")?
                                .map(|b| u64::from_le_bytes(b.try_into().unwrap()))
                                .unwrap_or(0);
                            txn.put("counter", (current + 1).to_le_bytes().to_vec())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let bytes = db.read().get("counter").unwrap().unwrap();
        assert_eq!(u64::from_le_bytes(bytes.try_into().unwrap()), threads * per_thread);
        assert_eq!(db.stats().commits, threads * per_thread);
    }

    #[test]
    fn test_reopen_from_backend_snapshot() {
        let db = seeded();
        let snapshot = db.backend().load().unwrap();
        let reopened = Database::from_backend(InMemoryBackend::with_snapshot(snapshot)).unwrap();
        assert_eq!(keys(reopened.read().scan("", "").unwrap()), vec!["a/1", "a/2", "a/3", "b/1"]);
        assert_eq!(reopened.stats().version, 1);
        assert_eq!(reopened.stats().commits, 0);
    }

    #[test]
    fn test_database_config_builder() {
        let config = DatabaseConfig::builder().sync_on_commit(false).build();
        assert!(!config.sync_on_commit);
        assert!(!config.wait_for_lock);
        assert!(DatabaseConfig::default().sync_on_commit);
        assert!(DatabaseConfig::builder().wait_for_lock(true).build().wait_for_lock);
    }
}
