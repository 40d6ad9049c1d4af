//! Staging index for notion-sync.
//!
//! Tracks the working tree state, detects document changes via content
//! hashing, and maintains the staging area between the working directory and
//! the next push.
//!
//! # Key Types
//!
//! - [`Index`] -- The tracked-file mapping (BTreeMap-backed, JSON on disk)
//! - [`FileEntry`] -- A tracked document record
//! - [`IndexStore`] -- Atomic load/save of the index under `.notion-sync/`
//! - [`StagingArea`] -- Add / reset / mark-synced / status operations
//! - [`StatusScanner`] -- Bounded worker pool classifying working-tree files
//! - [`FileStatus`] -- Kind of change (New, Modified, Deleted, Staged, ...)
//! - [`WorkdirStatus`] -- Status grouped for display

pub mod classify;
pub mod entry;
pub mod error;
pub mod index;
pub mod scanner;
pub mod staging;
pub mod status;
pub mod store;

pub use classify::{Classified, ClassifyPolicy};
pub use entry::FileEntry;
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use scanner::{collect_documents, ScanOutput, StatusScanner, DEFAULT_WORKERS};
pub use staging::{ResetOutcome, StagingArea};
pub use status::{FileStatus, StatusEntry, StatusMap, WorkdirStatus};
pub use store::{IndexStore, HASHES_DIR, INDEX_FILE, META_DIR};
