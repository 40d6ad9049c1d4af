//! Progress events published by the sync driver and the watcher.
//!
//! Producers emit structured [`ProgressEvent`]s on a [`ProgressBus`];
//! anything that renders progress subscribes to it. Emitting with no
//! subscribers is not an error.

use std::fmt;

use nsync_types::{PageId, SyncDirection};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the broadcast channel.
pub const DEFAULT_PROGRESS_CAPACITY: usize = 256;

/// A receiver of progress events.
pub type ProgressStream = broadcast::Receiver<ProgressEvent>;

/// One step of sync work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A filesystem change was seen on a document.
    Activity { path: String, kind: String },
    /// Work on `path` was scheduled.
    Queued { path: String },
    Started {
        path: String,
        direction: SyncDirection,
    },
    Completed {
        path: String,
        direction: SyncDirection,
        page_id: PageId,
    },
    Failed {
        path: String,
        direction: SyncDirection,
        error: String,
    },
}

impl ProgressEvent {
    pub fn path(&self) -> &str {
        match self {
            Self::Activity { path, .. }
            | Self::Queued { path }
            | Self::Started { path, .. }
            | Self::Completed { path, .. }
            | Self::Failed { path, .. } => path,
        }
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activity { path, kind } => write!(f, "{kind}: {path}"),
            Self::Queued { path } => write!(f, "queued {path}"),
            Self::Started { path, direction } => write!(f, "{direction} {path}"),
            Self::Completed {
                path,
                direction,
                page_id,
            } => write!(f, "{direction} {path} done ({page_id})"),
            Self::Failed {
                path,
                direction,
                error,
            } => write!(f, "{direction} {path} failed: {error}"),
        }
    }
}

/// Fan-out channel for [`ProgressEvent`]s. Cloning shares the channel.
#[derive(Clone, Debug)]
pub struct ProgressBus {
    sender: broadcast::Sender<ProgressEvent>,
}

impl ProgressBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> ProgressStream {
        self.sender.subscribe()
    }

    /// Publish an event. Returns the number of subscribers that received it.
    pub fn emit(&self, event: ProgressEvent) -> usize {
        trace!(event = %event, "progress");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_CAPACITY)
    }
}
