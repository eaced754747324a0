//! Error types for the record store.

use std::{io, path::PathBuf};

use snafu::Snafu;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during store operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    /// I/O error from the underlying storage backend.
    #[snafu(display("I/O error: {source}"))]
    Io {
        /// The underlying I/O error.
        source: io::Error,
    },

    /// Snapshot file is corrupted or has invalid format.
    #[snafu(display("Corrupted snapshot: {reason}"))]
    Corrupted {
        /// Description of what was corrupted.
        reason: String,
    },

    /// Snapshot checksum verification failed.
    #[snafu(display("Snapshot checksum mismatch: expected {expected:#018x}, computed {actual:#018x}"))]
    ChecksumMismatch {
        /// Checksum stored in the snapshot header.
        expected: u64,
        /// Checksum computed over the payload.
        actual: u64,
    },

    /// Invalid magic number in snapshot header.
    #[snafu(display("Invalid snapshot magic number"))]
    InvalidMagic,

    /// Unsupported snapshot format version.
    #[snafu(display("Unsupported format version: {version}"))]
    UnsupportedVersion {
        /// The unsupported version number.
        version: u16,
    },

    /// Snapshot payload could not be serialized or deserialized.
    #[snafu(display("Snapshot serialization failed: {source}"))]
    Serialization {
        /// The underlying postcard error.
        source: postcard::Error,
    },

    /// Another handle holds the exclusive lock on the data file.
    #[snafu(display("Data file is locked by another handle: {}", path.display()))]
    Locked {
        /// The lock file that could not be acquired.
        path: PathBuf,
    },

    /// The backend refused the write (used by fault injection in tests).
    #[snafu(display("Backend unavailable: {reason}"))]
    Unavailable {
        /// Why the backend refused the write.
        reason: String,
    },
}

impl Error {
    /// Whether the error indicates persisted state failed verification,
    /// as opposed to the backend being unreachable.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Error::Corrupted { .. }
                | Error::ChecksumMismatch { .. }
                | Error::InvalidMagic
                | Error::UnsupportedVersion { .. }
        )
    }
}

// Provide automatic conversion from io::Error to Error::Io for ergonomic ? usage
impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Io { source }
    }
}
