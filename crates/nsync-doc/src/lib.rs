//! Document header codec for notion-sync.
//!
//! Documents are markdown files that may start with a metadata block:
//!
//! ```text
//! ---
//! title: Meeting notes
//! notion_id: 0123456789abcdef0123456789abcdef
//! ---
//! # Body starts here
//! ```
//!
//! The sync core only consumes `notion_id` (and its legacy alias
//! `notion_page_id`); every other line of the block is carried through
//! untouched when a document is re-serialized.

pub mod codec;
pub mod document;
pub mod error;

pub use codec::{FrontMatterCodec, HeaderCodec};
pub use document::{Document, Header, HeaderLine, LEGACY_PAGE_ID_KEY, PAGE_ID_KEY};
pub use error::{DocError, DocResult};
