//! Foundation types for notion-sync.
//!
//! Every other crate in the workspace depends on `nsync-types`.
//!
//! # Key Types
//!
//! - [`ContentDigest`] -- 256-bit content hash of a document, hex on the wire
//! - [`PageId`] -- Identifier of a page on the remote document service
//! - [`RelPath`] -- Forward-slash path relative to the working tree root
//! - [`SyncDirection`] -- Direction argument of the `sync` command

pub mod digest;
pub mod direction;
pub mod error;
pub mod page;
pub mod path;

pub use digest::ContentDigest;
pub use direction::SyncDirection;
pub use error::TypeError;
pub use page::PageId;
pub use path::RelPath;
