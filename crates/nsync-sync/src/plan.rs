//! Dry-run planning for push.

use nsync_index::{FileStatus, StatusMap};
use serde::Serialize;

/// Which documents a push considers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushScope {
    /// Only staged documents.
    Staged,
    /// Staged, modified and new documents.
    Changed,
}

/// A document a push would upload, with the status that selected it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PushCandidate {
    pub path: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

/// Push candidates from a status map, in path order.
///
/// Deleted documents are never candidates: removing remote pages is not
/// supported.
pub fn plan_push(statuses: &StatusMap, scope: PushScope) -> Vec<PushCandidate> {
    statuses
        .iter()
        .filter(|(_, status)| match scope {
            PushScope::Staged => matches!(status, FileStatus::Staged),
            PushScope::Changed => matches!(
                status,
                FileStatus::Staged | FileStatus::Modified | FileStatus::New { .. }
            ),
        })
        .map(|(path, status)| PushCandidate {
            path: path.clone(),
            status: status.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses() -> StatusMap {
        [
            ("d.md", FileStatus::Deleted),
            ("c.md", FileStatus::New { previously_synced: false }),
            ("b.md", FileStatus::Modified),
            ("a.md", FileStatus::Staged),
        ]
        .into_iter()
        .map(|(p, s)| (p.to_string(), s))
        .collect()
    }

    #[test]
    fn staged_scope_selects_only_staged() {
        let plan = plan_push(&statuses(), PushScope::Staged);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].path, "a.md");
    }

    #[test]
    fn changed_scope_skips_deleted() {
        let paths: Vec<_> = plan_push(&statuses(), PushScope::Changed)
            .into_iter()
            .map(|c| c.path)
            .collect();
        assert_eq!(paths, vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn empty_map_plans_nothing() {
        assert!(plan_push(&StatusMap::new(), PushScope::Changed).is_empty());
    }
}
