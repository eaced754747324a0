//! Storage engine wrapper.
//!
//! Provides a thin wrapper around the record store with:
//! - Database lifecycle management
//! - Convenient constructors
//! - Cheap cloning of the shared handle

use std::{path::Path, sync::Arc};

use ledger_records_store::{Database, DatabaseConfig, FileBackend, InMemoryBackend};
use snafu::{ResultExt, Snafu};

/// Error context for storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    /// The database could not be opened.
    #[snafu(display("Failed to open database at {path}: {source}"))]
    Open {
        /// Location of the database.
        path: String,
        /// Underlying store error.
        source: ledger_records_store::Error,
    },
}

/// Storage engine backed by a snapshot file.
///
/// Wraps a [`Database`] with a [`FileBackend`] for persistent storage.
#[derive(Clone)]
pub struct StorageEngine {
    db: Arc<Database<FileBackend>>,
}

impl StorageEngine {
    /// Open the database at the given path. A missing file is an empty store.
    ///
    /// The handle holds the data file's lock until the last clone is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Open` if the file exists but cannot be read,
    /// fails verification, or is held by another handle.
    pub fn open(path: impl AsRef<Path>) -> std::result::Result<Self, EngineError> {
        Self::open_with_config(path, DatabaseConfig::default())
    }

    /// Open the database at the given path with custom configuration.
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: DatabaseConfig,
    ) -> std::result::Result<Self, EngineError> {
        let path = path.as_ref();
        let db = Database::open_with_config(path, config)
            .context(OpenSnafu { path: path.display().to_string() })?;

        tracing::debug!(path = %path.display(), "Opened storage engine");
        Ok(Self { db: Arc::new(db) })
    }

    /// Get a clone of the database handle.
    pub fn db(&self) -> Arc<Database<FileBackend>> {
        Arc::clone(&self.db)
    }
}

/// In-memory storage engine for testing.
///
/// Wraps a [`Database`] with an [`InMemoryBackend`].
#[derive(Clone)]
pub struct InMemoryStorageEngine {
    db: Arc<Database<InMemoryBackend>>,
}

impl InMemoryStorageEngine {
    /// Create a new in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Open` if backend initialization fails.
    pub fn open() -> std::result::Result<Self, EngineError> {
        let db = Database::open_in_memory().context(OpenSnafu { path: ":memory:" })?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Get a clone of the database handle.
    pub fn db(&self) -> Arc<Database<InMemoryBackend>> {
        Arc::clone(&self.db)
    }
}
