//! Storage backend abstraction for the record store.
//!
//! The backend trait abstracts where committed state lives, allowing both
//! file-based (durable) and in-memory (testing) implementations.
//!
//! # Snapshot Format
//!
//! Committed state is persisted as a whole-map snapshot:
//!
//! ```text
//! | 8 bytes: magic | 2 bytes: format version (LE) | 8 bytes: payload length (LE) |
//! | 8 bytes: seahash of payload (LE) | payload: postcard-encoded Snapshot |
//! ```
//!
//! A snapshot is accepted only if the magic, version, length and checksum all
//! verify. Anything else is reported as corruption rather than silently
//! producing an empty store.

mod file;
mod memory;

use std::collections::BTreeMap;

pub use file::FileBackend;
pub use memory::InMemoryBackend;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;

use crate::error::{Error, Result, SerializationSnafu};

/// Magic number for ledger record snapshot files.
pub const MAGIC: &[u8; 8] = b"LDGRRECS";

/// Current snapshot format version.
pub const FORMAT_VERSION: u16 = 1;

/// Size of the fixed snapshot header preceding the payload.
pub const HEADER_SIZE: usize = MAGIC.len() + 2 + 8 + 8;

/// Storage backend trait for abstracting where committed state is kept.
pub trait StorageBackend: Send + Sync {
    /// Loads the last persisted snapshot, or an empty one if nothing was
    /// ever persisted.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the read fails, or a corruption error if the
    /// persisted bytes fail verification.
    fn load(&self) -> Result<Snapshot>;

    /// Durably replaces the persisted snapshot.
    ///
    /// Either the whole snapshot is persisted or the previous one stays intact.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` or `Error::Unavailable` if the write fails.
    fn persist(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Committed key-value state at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of commits that produced this state.
    pub version: u64,
    /// Every key and its encoded record, in key order.
    pub entries: BTreeMap<String, Vec<u8>>,
}

impl Snapshot {
    /// Serializes the snapshot with its verification header.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if postcard encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let payload = postcard::to_allocvec(self).context(SerializationSnafu)?;
        let checksum = seahash::hash(&payload);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buf.extend_from_slice(&checksum.to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Parses and verifies a serialized snapshot.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidMagic`, `Error::UnsupportedVersion`,
    /// `Error::Corrupted`, `Error::ChecksumMismatch` or
    /// `Error::Serialization` when the bytes fail verification.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::Corrupted {
                reason: format!("snapshot is {} bytes, header needs {HEADER_SIZE}", bytes.len()),
            });
        }
        let (header, payload) = bytes.split_at(HEADER_SIZE);

        if &header[..8] != MAGIC {
            return Err(Error::InvalidMagic);
        }
        let version = u16::from_le_bytes([header[8], header[9]]);
        if version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion { version });
        }
        let declared_len = read_u64(&header[10..18]);
        if declared_len != payload.len() as u64 {
            return Err(Error::Corrupted {
                reason: format!(
                    "payload length {} does not match declared length {declared_len}",
                    payload.len()
                ),
            });
        }
        let expected = read_u64(&header[18..26]);
        let actual = seahash::hash(payload);
        if expected != actual {
            return Err(Error::ChecksumMismatch { expected, actual });
        }

        postcard::from_bytes(payload).context(SerializationSnafu)
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
