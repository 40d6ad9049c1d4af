use thiserror::Error;

/// Errors produced while parsing or validating foundation types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid page id {input:?}: {reason}")]
    InvalidPageId { input: String, reason: String },

    #[error("path {path:?} escapes the working tree")]
    PathTraversal { path: String },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid sync direction {0:?}: expected push, pull or bidirectional")]
    InvalidDirection(String),
}
