//! Sync driver for notion-sync.
//!
//! Moves documents between the working tree and the remote document service.
//! The remote side is reached only through the [`RemoteClient`] trait.
//!
//! # Key Types
//!
//! - [`SyncDriver`] -- Push / pull contract used by the watcher and the CLI
//! - [`DocumentDriver`] -- `SyncDriver` over a `RemoteClient` and the header codec
//! - [`ProgressBus`] -- Broadcast channel of [`ProgressEvent`]s
//! - [`plan_push`] -- Dry-run selection of push candidates
//! - [`newest_wins`] -- Bidirectional conflict signalling

pub mod conflict;
pub mod driver;
pub mod error;
pub mod plan;
pub mod progress;
pub mod remote;

pub use conflict::{newest_wins, Resolution, Side};
pub use driver::{DocumentDriver, PageRef, PullRequest, PulledDocument, PushOutcome, SyncDriver};
pub use error::{SyncError, SyncResult};
pub use plan::{plan_push, PushCandidate, PushScope};
pub use progress::{ProgressBus, ProgressEvent, ProgressStream, DEFAULT_PROGRESS_CAPACITY};
pub use remote::{PageDraft, RemoteClient, RemotePage, UnlinkedClient};
