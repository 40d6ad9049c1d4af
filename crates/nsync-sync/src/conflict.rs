//! Newest-wins signalling for bidirectional sync.
//!
//! There is no merge: when both sides changed since the last sync the newer
//! side wins and the result is flagged as a conflict so the caller can warn.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Local,
    Remote,
}

/// What a bidirectional sync should do with one document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Resolution {
    /// Neither side changed since the last sync.
    UpToDate,
    /// Only the local document changed.
    Push,
    /// Only the remote page changed.
    Pull,
    /// Both changed; `winner` is the more recently edited side.
    Conflict { winner: Side },
}

impl Resolution {
    /// The side whose content should be propagated, if any.
    pub fn winner(&self) -> Option<Side> {
        match self {
            Self::UpToDate => None,
            Self::Push => Some(Side::Local),
            Self::Pull => Some(Side::Remote),
            Self::Conflict { winner } => Some(*winner),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Decide between a local document and its remote page.
///
/// A document that was never synced counts as changed on both sides. Ties
/// go to the local side.
pub fn newest_wins(
    local_modified: DateTime<Utc>,
    remote_edited: DateTime<Utc>,
    last_synced: Option<DateTime<Utc>>,
) -> Resolution {
    let (local_changed, remote_changed) = match last_synced {
        Some(synced) => (local_modified > synced, remote_edited > synced),
        None => (true, true),
    };
    match (local_changed, remote_changed) {
        (false, false) => Resolution::UpToDate,
        (true, false) => Resolution::Push,
        (false, true) => Resolution::Pull,
        (true, true) => Resolution::Conflict {
            winner: if remote_edited > local_modified {
                Side::Remote
            } else {
                Side::Local
            },
        },
    }
}
