//! File-based storage backend.
//!
//! Each persist writes the full snapshot to a sibling temporary file, syncs
//! it, and renames it over the data file. A crash at any point leaves either
//! the old or the new snapshot in place, never a mix of both.
//!
//! Every backend holds an exclusive OS lock on a sibling `<file>.lock` for
//! its whole lifetime, so at most one handle (in any process) loads and
//! replaces the snapshot at a time.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use fs2::FileExt;

use super::{Snapshot, StorageBackend};
use crate::error::{Error, Result};

/// File-based storage backend.
///
/// A missing data file is treated as an empty store; it is created by the
/// first commit.
#[derive(Debug)]
pub struct FileBackend {
    /// Path of the data file.
    path: PathBuf,
    /// Whether to fsync the data and its directory on every persist.
    sync_on_persist: bool,
    /// Open handle on the lock file. The lock is released when it closes.
    lock: File,
}

impl FileBackend {
    /// Opens the data file at `path`, syncing on every persist.
    ///
    /// The file does not need to exist yet, but its directory does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Locked`] if another handle holds the lock, or
    /// [`Error::Io`] if the lock file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, true, false)
    }

    /// Opens the data file at `path` with an explicit sync policy.
    ///
    /// With `wait_for_lock` set, blocks until the current holder releases
    /// the lock instead of failing with [`Error::Locked`].
    ///
    /// # Errors
    ///
    /// Same as [`open`](Self::open).
    pub fn with_options(
        path: impl AsRef<Path>,
        sync_on_persist: bool,
        wait_for_lock: bool,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let lock = acquire_lock(&sibling_path(&path, ".lock"), wait_for_lock)?;
        Ok(Self { path, sync_on_persist, lock })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the lock file guarding the data file.
    pub fn lock_path(&self) -> PathBuf {
        sibling_path(&self.path, ".lock")
    }

    fn temp_path(&self) -> PathBuf {
        sibling_path(&self.path, ".tmp")
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock) {
            tracing::warn!(
                path = %self.lock_path().display(),
                error = %e,
                "Failed to release data file lock"
            );
        } else {
            tracing::debug!(path = %self.lock_path().display(), "Released data file lock");
        }
    }
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn acquire_lock(lock_path: &Path, wait: bool) -> Result<File> {
    let file =
        OpenOptions::new().read(true).write(true).create(true).truncate(false).open(lock_path)?;

    if wait {
        file.lock_exclusive()?;
        tracing::debug!(path = %lock_path.display(), "Acquired data file lock");
        return Ok(file);
    }

    match file.try_lock_exclusive() {
        Ok(()) => {
            tracing::debug!(path = %lock_path.display(), "Acquired data file lock");
            Ok(file)
        },
        Err(e)
            if e.kind() == io::ErrorKind::WouldBlock
                || e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
        {
            tracing::warn!(path = %lock_path.display(), "Data file is locked by another handle");
            Err(Error::Locked { path: lock_path.to_path_buf() })
        },
        Err(e) => Err(e.into()),
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> Result<Snapshot> {
        let mut file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::default()),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Snapshot::from_bytes(&bytes)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = snapshot.to_bytes()?;
        let temp = self.temp_path();

        {
            let mut file =
                OpenOptions::new().write(true).create(true).truncate(true).open(&temp)?;
            file.write_all(&bytes)?;
            if self.sync_on_persist {
                file.sync_all()?;
            }
        }

        fs::rename(&temp, &self.path)?;

        // Persist the rename itself. Directory fsync is not supported on every
        // platform, so a failure to open the directory is not fatal.
        if self.sync_on_persist {
            let parent = match self.path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }
}
