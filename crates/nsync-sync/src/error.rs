use std::io;
use std::path::PathBuf;

use nsync_doc::DocError;
use nsync_types::TypeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl SyncError {
    /// Returns `true` for [`SyncError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<TypeError> for SyncError {
    fn from(err: TypeError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<DocError> for SyncError {
    fn from(err: DocError) -> Self {
        match err {
            DocError::Io { path, source } => Self::Io { path, source },
            DocError::NotUtf8(path) => {
                Self::InvalidInput(format!("{} is not valid UTF-8", path.display()))
            }
            DocError::InvalidPageId(e) => e.into(),
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
