//! Cross-process pass lock.
//!
//! At most one reconciliation pass may run against a data directory. The lock
//! is an advisory exclusive lock on `<data_dir>/extsync.lock`; the file body
//! records the holder's state for `status` output. The lock is released when
//! the guard is dropped.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

use crate::error::{io_err, SyncError};

/// Guard holding the pass lock.
#[derive(Debug)]
pub struct PassLock {
    file: File,
    path: PathBuf,
}

impl PassLock {
    /// Take the lock without blocking, writing `state` into the lock file.
    ///
    /// Fails with [`SyncError::Locked`] if another process holds it.
    pub fn acquire(path: &Path, state: &str) -> Result<Self, SyncError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|e| io_err(path, e))?;

        let acquired = FileExt::try_lock_exclusive(&file).map_err(|e| io_err(path, e))?;
        if !acquired {
            return Err(SyncError::Locked {
                path: path.to_path_buf(),
            });
        }

        file.set_len(0).map_err(|e| io_err(path, e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| io_err(path, e))?;
        file.write_all(state.as_bytes()).map_err(|e| io_err(path, e))?;
        file.flush().map_err(|e| io_err(path, e))?;

        tracing::debug!("acquired pass lock {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Whether some process currently holds the lock, and its recorded state.
    pub fn probe(path: &Path) -> Result<(bool, Option<String>), SyncError> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok((false, None)),
            Err(err) => return Err(io_err(path, err)),
        };
        let mut state = String::new();
        file.read_to_string(&mut state).map_err(|e| io_err(path, e))?;

        let free = FileExt::try_lock_shared(&file).map_err(|e| io_err(path, e))?;
        if free {
            FileExt::unlock(&file).map_err(|e| io_err(path, e))?;
        }
        Ok((!free, Some(state).filter(|s| !s.is_empty())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PassLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!("failed to release pass lock {}: {}", self.path.display(), err);
        } else {
            tracing::debug!("released pass lock {}", self.path.display());
        }
    }
}

/// Lock state string for the current process.
pub fn process_state() -> String {
    format!("pid={}", std::process::id())
}
