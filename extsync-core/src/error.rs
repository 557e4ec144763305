//! Error types for extsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from catalog, discovery and configuration code.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse error on config load, with the offending file path.
    #[error("failed to parse config at {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configured reference prefix did not produce a valid pattern.
    #[error("invalid extension reference pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// `dirs` could not locate a data or config directory.
    #[error("cannot determine {what} directory; set $HOME or equivalent")]
    DirNotFound { what: &'static str },
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
