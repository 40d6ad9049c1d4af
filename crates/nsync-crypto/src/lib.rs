//! Content hashing for notion-sync.
//!
//! Provides the streaming file hasher used by the staging area to decide
//! whether a document changed. All hashing wraps BLAKE3; no custom
//! cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, FileHasher, HashError};
