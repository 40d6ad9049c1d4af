use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid exclude pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("watch root {0} is not a directory")]
    RootMissing(PathBuf),

    #[error("filesystem notification error: {0}")]
    Notify(#[from] notify::Error),
}

pub type WatchResult<T> = Result<T, WatchError>;
