//! Error types for the index crate.

use std::io;
use std::path::PathBuf;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// Filesystem failure (open, read, write, stat).
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The index file exists but cannot be decoded.
    #[error("corrupt index at {path}: {reason}")]
    CorruptIndex { path: PathBuf, reason: String },

    /// Staging a path that does not exist in the working tree.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// A user-supplied path was rejected.
    #[error("invalid path: {0}")]
    InvalidPath(#[from] nsync_types::TypeError),

    /// Hashing a document failed.
    #[error(transparent)]
    Hash(#[from] nsync_crypto::HashError),

    /// Walking the working tree failed at its root.
    #[error("failed to walk working tree: {0}")]
    Walk(#[from] walkdir::Error),
}

impl IndexError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
