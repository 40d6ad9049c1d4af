//! Filesystem watcher for notion-sync.
//!
//! Turns raw filesystem notifications on the markdown root into one push per
//! quiet document.
//!
//! # Key Types
//!
//! - [`FsWatcher`] -- notify subscription and event loop
//! - [`EventFilter`] -- Markdown-only, write-only, exclude globs
//! - [`Debouncer`] -- Per-path timers; one handler call per burst
//! - [`PushHandler`] -- Pushes through a `SyncDriver`, then marks synced

pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod handler;
pub mod watcher;

pub use config::{WatchConfig, DEFAULT_DEBOUNCE};
pub use debounce::{Debouncer, PathHandler};
pub use error::{WatchError, WatchResult};
pub use filter::{is_write, EventFilter};
pub use handler::PushHandler;
pub use watcher::FsWatcher;
