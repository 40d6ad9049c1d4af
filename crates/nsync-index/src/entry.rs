//! Index entry type for tracked working-tree documents.

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use nsync_types::ContentDigest;
use serde::{Deserialize, Serialize};

/// An entry in the index, representing a tracked document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Forward-slash path relative to the working tree root.
    pub path: String,
    /// Digest of the content last observed by add or sync.
    pub hash: ContentDigest,
    /// Modification time observed together with `hash`.
    pub last_modified: DateTime<Utc>,
    /// Last successful remote sync; `None` if never synced.
    #[serde(with = "zero_time")]
    pub last_synced: Option<DateTime<Utc>>,
    /// Whether the document is marked for the next push.
    pub staged: bool,
}

impl FileEntry {
    /// Create an unstaged, never-synced entry.
    pub fn new(path: impl Into<String>, hash: ContentDigest, last_modified: DateTime<Utc>) -> Self {
        Self {
            path: path.into(),
            hash,
            last_modified,
            last_synced: None,
            staged: false,
        }
    }

    /// Create a staged entry.
    pub fn new_staged(
        path: impl Into<String>,
        hash: ContentDigest,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let mut entry = Self::new(path, hash, last_modified);
        entry.staged = true;
        entry
    }

    /// Returns `true` if the entry has been synced at least once.
    pub fn is_synced(&self) -> bool {
        self.last_synced.is_some()
    }
}

/// Convert a filesystem timestamp to the index's wall-clock type.
pub fn to_datetime(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

/// Serde adapter writing "never" as the zero timestamp
/// `0001-01-01T00:00:00Z`, the on-disk convention for unsynced entries.
mod zero_time {
    use chrono::{DateTime, Datelike, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const ZERO: &str = "0001-01-01T00:00:00Z";

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => ts.serialize(serializer),
            None => serializer.serialize_str(ZERO),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let value = Option::<DateTime<Utc>>::deserialize(deserializer)?;
        Ok(value.filter(|ts| ts.year() > 1))
    }
}
