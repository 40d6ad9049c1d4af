//! Working directory status types.
//!
//! [`FileStatus`] is the classifier's verdict for one document;
//! [`WorkdirStatus`] groups a whole status map into the buckets the `status`
//! command prints.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Status of every actionable path, keyed by relative path.
///
/// Produced by [`StagingArea::status`](crate::StagingArea::status); never
/// contains [`FileStatus::Unmodified`] or [`FileStatus::Unknown`].
pub type StatusMap = BTreeMap<String, FileStatus>;

/// The kind of change detected for one document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// Tracked and unchanged since it was last added or synced.
    Unmodified,
    /// Tracked, not staged, and its content changed.
    Modified,
    /// Not tracked and recent enough to deserve attention.
    New {
        /// The document header already names a remote page.
        previously_synced: bool,
    },
    /// Tracked but missing from the working tree.
    Deleted,
    /// Tracked, staged, and present.
    Staged,
    /// Classification failed; only ever logged.
    Unknown {
        /// Why the file could not be classified.
        reason: String,
    },
}

impl FileStatus {
    /// Returns `true` for statuses the status command reports.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Self::Unmodified | Self::Unknown { .. })
    }

    /// Short lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unmodified => "unmodified",
            Self::Modified => "modified",
            Self::New { .. } => "new",
            Self::Deleted => "deleted",
            Self::Staged => "staged",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Complete status of the working directory, grouped for display.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WorkdirStatus {
    /// Documents staged for the next push.
    pub staged: Vec<String>,
    /// Tracked documents modified since last add or sync.
    pub modified: Vec<String>,
    /// Documents present in the working tree but not tracked.
    pub untracked: Vec<StatusEntry>,
    /// Tracked documents that have been deleted.
    pub deleted: Vec<String>,
}

impl WorkdirStatus {
    /// Create an empty status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Group a status map. Paths stay in map (lexical) order.
    pub fn from_map(map: &StatusMap) -> Self {
        let mut status = Self::new();
        for (path, file_status) in map {
            match file_status {
                FileStatus::Staged => status.staged.push(path.clone()),
                FileStatus::Modified => status.modified.push(path.clone()),
                FileStatus::New { .. } => status
                    .untracked
                    .push(StatusEntry::new(path, file_status.clone())),
                FileStatus::Deleted => status.deleted.push(path.clone()),
                FileStatus::Unmodified | FileStatus::Unknown { .. } => {}
            }
        }
        status
    }

    /// Returns `true` if there are no changes of any kind.
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.modified.is_empty()
            && self.untracked.is_empty()
            && self.deleted.is_empty()
    }

    /// Paths that `add .` stages: modified and untracked documents.
    pub fn addable(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .modified
            .iter()
            .cloned()
            .chain(self.untracked.iter().map(|e| e.path.clone()))
            .collect();
        paths.sort();
        paths
    }
}

/// A single status entry representing a file change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    /// The file path relative to the working tree root.
    pub path: String,
    /// The kind of change.
    pub status: FileStatus,
}

impl StatusEntry {
    /// Create a new status entry.
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
        }
    }
}
