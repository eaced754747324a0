//! Record contracts for ledger-records.
//!
//! This crate sits on top of the transactional store (`ledger-records-store`)
//! and maps typed records onto its flat key space:
//!
//! - Keyed record accessor with existence checks and per-type listing
//! - Vote tally contract (parties and vote counters)
//! - Real-estate registry contract (listings, owners, prices)
//! - RBAC contract (projects, roles, permissions, users, grants, assignments)
//!
//! Every contract operation takes the transaction it runs in. Run one
//! invocation through `Database::execute` to commit its writes together or
//! discard them all on error.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod keys;
pub mod rbac;
mod record;
pub mod registry;
pub mod vote;

pub use engine::{EngineError, InMemoryStorageEngine, StorageEngine};
pub use error::{RecordError, Result};
pub use keys::{KEY_SEPARATOR, RecordKey, decode_record_key, encode_record_key, kind_range};
pub use rbac::RbacContract;
pub use record::{RecordIter, RecordStore};
pub use registry::RealEstateRegistry;
pub use vote::VoteTally;
