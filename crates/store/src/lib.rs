//! ledger-records-store: the world-state collaborator behind the record contracts.
//!
//! A flat, ordered key space of `String` keys and opaque byte values with:
//!
//! - **Single writer**: one write transaction at a time, held for the whole transaction
//! - **Exclusive file access**: a file-backed database holds an OS lock on `<file>.lock`
//! - **Snapshot reads**: readers capture the committed map via `ArcSwap` and never block
//! - **Atomic commits**: every write of a transaction is published together or not at all
//! - **Checksummed snapshots**: the file backend verifies magic, version and seahash on load
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Database API                  │
//! │        (open, read, write, execute)         │
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │             Transaction Layer                │
//! │ (ReadTxn: snapshot, WriteTxn: buffer+commit)│
//! └────────────────┬────────────────────────────┘
//!                  │
//! ┌────────────────▼────────────────────────────┐
//! │            Storage Backend                   │
//! │      (FileBackend / InMemoryBackend)        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use ledger_records_store::{Database, StateReader, StateWriter};
//!
//! let db = Database::open_in_memory()?;
//!
//! db.execute(|txn| txn.put("party/Democrats", b"{}".to_vec()))?;
//!
//! let txn = db.read();
//! let value = txn.get("party/Democrats")?;
//! # Ok::<(), ledger_records_store::Error>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
// Test code style - allow field reassignment after default
#![cfg_attr(test, allow(clippy::field_reassign_with_default))]

pub mod backend;
pub mod db;
pub mod error;

// Re-export commonly used types
pub use backend::{
    FORMAT_VERSION, FileBackend, HEADER_SIZE, InMemoryBackend, MAGIC, Snapshot, StorageBackend,
};
pub use db::{
    Database, DatabaseConfig, DatabaseStats, ReadTransaction, ScanIter, StateReader, StateWriter,
    WriteTransaction,
};
pub use error::{Error, Result};
