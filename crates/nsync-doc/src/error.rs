use std::io;
use std::path::PathBuf;

/// Errors from reading or writing documents.
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// The document could not be read or written.
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The document is not valid UTF-8.
    #[error("{0} is not valid UTF-8")]
    NotUtf8(PathBuf),

    /// The header carries a page id that does not parse.
    #[error("invalid page id in header: {0}")]
    InvalidPageId(#[from] nsync_types::TypeError),
}

/// Convenience alias for document results.
pub type DocResult<T> = Result<T, DocError>;
