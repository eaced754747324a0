//! Recovery tests for the file-backed snapshot.
//!
//! Each test writes committed state through a `Database<FileBackend>`, then
//! simulates a crash or a damaged disk by manipulating the data file directly,
//! and reopens the database to check what survives.
//!
//! # Crash Points in a Commit
//!
//! ```text
//! FileBackend::persist():
//!   1. Write snapshot to `<file>.tmp`       ← crash leaves a stray temp file
//!   2. fsync temp file
//!   3. rename temp over data file           ← atomic switch point
//!   4. fsync directory
//! ```

// Test code is allowed to use unwrap for simplicity
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::disallowed_methods)]

use std::{fs, path::Path, thread};

use ledger_records_store::{
    Database, DatabaseConfig, Error, FileBackend, HEADER_SIZE, StateReader, StateWriter,
    StorageBackend,
};

/// Helper: create a database with two commits. Returns the data file path.
fn setup_two_commits(dir: &Path) -> std::path::PathBuf {
    let db_path = dir.join("records.db");

    let db = Database::open(&db_path).unwrap();

    let mut txn = db.write();
    txn.put("party/Democrats", br#"{"name":"Democrats","vote_count":0}"#.to_vec()).unwrap();
    txn.commit().unwrap();

    let mut txn = db.write();
    txn.put("party/Republicans", br#"{"name":"Republicans","vote_count":0}"#.to_vec()).unwrap();
    txn.commit().unwrap();

    db_path
}

#[test]
fn test_committed_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    let db = Database::open(&path).unwrap();
    let txn = db.read();
    assert!(txn.contains("party/Democrats").unwrap());
    assert!(txn.contains("party/Republicans").unwrap());
    assert_eq!(db.stats().version, 2);
}

#[test]
fn test_uncommitted_writes_do_not_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    {
        let db = Database::open(&path).unwrap();
        let mut txn = db.write();
        txn.put("party/Greens", b"{}".to_vec()).unwrap();
        txn.delete("party/Democrats").unwrap();
        // dropped without commit
    }

    let db = Database::open(&path).unwrap();
    let txn = db.read();
    assert!(!txn.contains("party/Greens").unwrap());
    assert!(txn.contains("party/Democrats").unwrap());
}

#[test]
fn test_deletes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    {
        let db = Database::open(&path).unwrap();
        db.execute(|txn| txn.delete("party/Democrats").map(|_| ())).unwrap();
    }

    let db = Database::open(&path).unwrap();
    let keys: Vec<_> = db.read().scan("party/", "party0").unwrap().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["party/Republicans"]);
}

#[test]
fn test_stray_temp_file_is_ignored() {
    // Crash after step 1: the temp file holds a newer snapshot, the data
    // file still holds the previous one.
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());
    let temp = dir.path().join("records.db.tmp");
    fs::write(&temp, b"half-written snapshot").unwrap();

    let db = Database::open(&path).unwrap();
    assert_eq!(db.stats().version, 2);

    // The next commit replaces the stray temp file
    db.execute(|txn| txn.put("party/Greens", b"{}".to_vec())).unwrap();
    assert!(!temp.exists());
    drop(db);
    assert_eq!(Database::open(&path).unwrap().stats().version, 3);
}

#[test]
fn test_flipped_payload_bit_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    let mut bytes = fs::read(&path).unwrap();
    let middle = HEADER_SIZE + (bytes.len() - HEADER_SIZE) / 2;
    bytes[middle] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    let err = Database::open(&path).err().unwrap();
    assert!(matches!(err, Error::ChecksumMismatch { .. }), "got {err}");
    assert!(err.is_corruption());
}

#[test]
fn test_truncated_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();

    let err = Database::open(&path).err().unwrap();
    assert!(matches!(err, Error::Corrupted { .. }), "got {err}");
}

#[test]
fn test_empty_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    fs::write(&path, b"").unwrap();

    let err = Database::open(&path).err().unwrap();
    assert!(err.is_corruption());
}

#[test]
fn test_foreign_file_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    fs::write(&path, vec![0u8; HEADER_SIZE + 16]).unwrap();

    let err = Database::open(&path).err().unwrap();
    assert!(matches!(err, Error::InvalidMagic));
}

#[test]
fn test_backend_load_matches_database_view() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    let snapshot = FileBackend::open(&path).unwrap().load().unwrap();
    let db = Database::open(&path).unwrap();
    let scanned: Vec<_> = db.read().scan("", "").unwrap().collect();
    let loaded: Vec<_> = snapshot.entries.into_iter().collect();
    assert_eq!(scanned, loaded);
}

// ============================================================================
// Exclusive access
// ============================================================================

#[test]
fn test_second_open_of_same_file_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = setup_two_commits(dir.path());

    let db = Database::open(&path).unwrap();
    let err = Database::open(&path).err().unwrap();
    assert!(matches!(err, Error::Locked { .. }), "got {err}");

    // The refused handle loaded nothing and overwrote nothing
    db.execute(|txn| txn.put("party/Greens", b"{}".to_vec())).unwrap();
    drop(db);
    let reopened = Database::open(&path).unwrap();
    assert_eq!(reopened.stats().version, 3);
    assert!(reopened.read().contains("party/Greens").unwrap());
}

#[test]
fn test_waiting_handles_see_each_others_commits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.db");
    let config = DatabaseConfig::builder().sync_on_commit(false).wait_for_lock(true).build();

    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let path = path.clone();
            let config = config.clone();
            thread::spawn(move || {
                let db = Database::open_with_config(&path, config).unwrap();
                db.execute(|txn| {
                    let count = txn.get("counter")?.map_or(0, |b| b[0]);
                    txn.put("counter", vec![count + 1])?;
                    txn.put(&format!("writer/{i}"), Vec::new())
                })
                .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let db = Database::open(&path).unwrap();
    assert_eq!(db.read().get("counter").unwrap(), Some(vec![4]));
    assert_eq!(db.stats().version, 4);
}
