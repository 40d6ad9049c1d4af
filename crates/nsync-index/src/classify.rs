//! Per-document classification rules.
//!
//! Untracked documents are judged by age because the remote side has no
//! stable local identifier for a page until its first push: a recent file is
//! probably work in progress, an old one is probably detritus.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nsync_crypto::{FileHasher, HashError};

use crate::entry::FileEntry;
use crate::status::FileStatus;

/// Default age limit for untracked documents without a page id.
pub const DEFAULT_FRESH_WINDOW: Duration = Duration::from_secs(60 * 60);
/// Default age limit for untracked documents whose header names a page.
pub const DEFAULT_SYNCED_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Age thresholds for classifying untracked documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClassifyPolicy {
    /// Untracked documents without a page id count as new only if modified
    /// within this window.
    pub fresh_window: Duration,
    /// Untracked documents carrying a page id count as new only if modified
    /// within this window.
    pub synced_window: Duration,
}

impl Default for ClassifyPolicy {
    fn default() -> Self {
        Self {
            fresh_window: DEFAULT_FRESH_WINDOW,
            synced_window: DEFAULT_SYNCED_WINDOW,
        }
    }
}

/// Outcome of classifying one tracked document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classified {
    pub status: FileStatus,
    /// Set when the content hash matched despite a newer mtime; the entry's
    /// `last_modified` should be bumped to this value.
    pub healed: Option<DateTime<Utc>>,
}

impl Classified {
    fn plain(status: FileStatus) -> Self {
        Self {
            status,
            healed: None,
        }
    }
}

impl ClassifyPolicy {
    /// Classify a document that has no index entry.
    pub fn classify_untracked(
        &self,
        mtime: DateTime<Utc>,
        now: DateTime<Utc>,
        has_page_id: bool,
    ) -> FileStatus {
        let window = if has_page_id {
            self.synced_window
        } else {
            self.fresh_window
        };
        if modified_within(mtime, now, window) {
            FileStatus::New {
                previously_synced: has_page_id,
            }
        } else {
            FileStatus::Unmodified
        }
    }

    /// Classify a document that has an index entry and exists on disk.
    ///
    /// Staging wins over modification. Files whose mtime is not newer than
    /// the recorded one are never hashed.
    pub fn classify_tracked(
        &self,
        entry: &FileEntry,
        mtime: DateTime<Utc>,
        abs_path: &Path,
        hasher: &dyn FileHasher,
    ) -> Result<Classified, HashError> {
        if entry.staged {
            return Ok(Classified::plain(FileStatus::Staged));
        }
        if mtime <= entry.last_modified {
            return Ok(Classified::plain(FileStatus::Unmodified));
        }

        let digest = hasher.hash_file(abs_path)?;
        if digest == entry.hash {
            Ok(Classified {
                status: FileStatus::Unmodified,
                healed: Some(mtime),
            })
        } else {
            Ok(Classified::plain(FileStatus::Modified))
        }
    }
}

/// Files with an mtime in the future count as recent.
fn modified_within(mtime: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    match (now - mtime).to_std() {
        Ok(age) => age <= window,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use nsync_crypto::ContentHasher;
    use nsync_types::ContentDigest;

    fn hours_ago(now: DateTime<Utc>, h: i64) -> DateTime<Utc> {
        now - TimeDelta::hours(h)
    }

    #[test]
    fn untracked_without_page_id_uses_fresh_window() {
        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        assert_eq!(
            policy.classify_untracked(now - TimeDelta::minutes(30), now, false),
            FileStatus::New { previously_synced: false }
        );
        assert_eq!(
            policy.classify_untracked(hours_ago(now, 2), now, false),
            FileStatus::Unmodified
        );
    }

    #[test]
    fn untracked_with_page_id_uses_synced_window() {
        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        assert_eq!(
            policy.classify_untracked(hours_ago(now, 2), now, true),
            FileStatus::New { previously_synced: true }
        );
        assert_eq!(
            policy.classify_untracked(hours_ago(now, 25), now, true),
            FileStatus::Unmodified
        );
    }

    #[test]
    fn future_mtime_counts_as_recent() {
        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        assert!(matches!(
            policy.classify_untracked(now + TimeDelta::hours(3), now, false),
            FileStatus::New { .. }
        ));
    }

    #[test]
    fn windows_are_configurable() {
        let policy = ClassifyPolicy {
            fresh_window: Duration::from_secs(3 * 60 * 60),
            synced_window: Duration::from_secs(60),
        };
        let now = Utc::now();
        assert!(matches!(
            policy.classify_untracked(hours_ago(now, 2), now, false),
            FileStatus::New { .. }
        ));
        assert_eq!(
            policy.classify_untracked(hours_ago(now, 2), now, true),
            FileStatus::Unmodified
        );
    }

    #[test]
    fn staged_wins_without_hashing() {
        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        let entry = FileEntry::new_staged("a.md", ContentDigest::from_hash([0; 32]), hours_ago(now, 1));
        // The path does not exist; hashing it would fail.
        let out = policy
            .classify_tracked(&entry, now, Path::new("/nonexistent/a.md"), &ContentHasher)
            .unwrap();
        assert_eq!(out.status, FileStatus::Staged);
    }

    #[test]
    fn unchanged_mtime_skips_hashing() {
        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        let entry = FileEntry::new("a.md", ContentDigest::from_hash([0; 32]), now);
        let out = policy
            .classify_tracked(&entry, now, Path::new("/nonexistent/a.md"), &ContentHasher)
            .unwrap();
        assert_eq!(out, Classified::plain(FileStatus::Unmodified));
    }

    #[test]
    fn newer_mtime_with_same_content_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, b"hello").unwrap();

        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        let entry = FileEntry::new("a.md", ContentHasher::hash_bytes(b"hello"), hours_ago(now, 1));
        let out = policy.classify_tracked(&entry, now, &path, &ContentHasher).unwrap();
        assert_eq!(out.status, FileStatus::Unmodified);
        assert_eq!(out.healed, Some(now));
    }

    #[test]
    fn newer_mtime_with_different_content_is_modified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.md");
        std::fs::write(&path, b"hello world").unwrap();

        let policy = ClassifyPolicy::default();
        let now = Utc::now();
        let entry = FileEntry::new("a.md", ContentHasher::hash_bytes(b"hello"), hours_ago(now, 1));
        let out = policy.classify_tracked(&entry, now, &path, &ContentHasher).unwrap();
        assert_eq!(out, Classified::plain(FileStatus::Modified));
    }
}
