//! Error types for extsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use extsync_core::CoreError;

/// All errors that can abort a reconciliation pass.
///
/// Failures of individual backend operations are not represented here; they
/// are recorded per step as [`crate::executor::ExecError`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from configuration, catalog or discovery code.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (snapshot commit).
    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Another reconciliation pass holds the lock.
    #[error("another reconciliation pass is running (lock held: {path})")]
    Locked { path: PathBuf },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
