//! The in-memory index mapping working-tree paths to tracked entries.
//!
//! [`Index`] is a plain value: readers take a snapshot after
//! [`IndexStore::load`](crate::IndexStore::load) and writers re-read, mutate
//! and save. Nothing here touches the filesystem.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::FileEntry;

/// The tracked-file mapping, keyed by relative path.
///
/// Serializes as a bare JSON object `{ "<path>": FileEntry, ... }`. The
/// `BTreeMap` keeps key order stable so identical indexes serialize to
/// identical bytes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    entries: BTreeMap<String, FileEntry>,
}

impl Index {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by path.
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Get a mutable entry by path.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut FileEntry> {
        self.entries.get_mut(path)
    }

    /// Returns `true` if `path` is tracked.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace an entry, keyed by its own path.
    pub fn insert(&mut self, entry: FileEntry) -> Option<FileEntry> {
        self.entries.insert(entry.path.clone(), entry)
    }

    /// Iterate entries in path order.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    /// Paths of all staged entries.
    pub fn staged_paths(&self) -> BTreeSet<String> {
        self.entries
            .values()
            .filter(|e| e.staged)
            .map(|e| e.path.clone())
            .collect()
    }

    /// Clear the staged flag on `path`. Returns `true` if it was staged.
    pub fn unstage(&mut self, path: &str) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) if entry.staged => {
                entry.staged = false;
                true
            }
            _ => false,
        }
    }

    /// Unstage every entry, returning the paths that were staged.
    pub fn unstage_all(&mut self) -> Vec<String> {
        let mut cleared = Vec::new();
        for entry in self.entries.values_mut() {
            if entry.staged {
                entry.staged = false;
                cleared.push(entry.path.clone());
            }
        }
        cleared
    }

    /// Record a successful sync of `path` at `now`. Returns `false` if the
    /// path is not tracked.
    pub fn mark_synced(&mut self, path: &str, now: DateTime<Utc>) -> bool {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.last_synced = Some(now);
                entry.staged = false;
                true
            }
            None => false,
        }
    }

    /// Re-key entries whose stored `path` disagrees with their map key.
    ///
    /// The key is authoritative. Returns the number of entries fixed.
    pub(crate) fn normalize_keys(&mut self) -> usize {
        let mut fixed = 0;
        for (key, entry) in self.entries.iter_mut() {
            if entry.path != *key {
                entry.path = key.clone();
                fixed += 1;
            }
        }
        fixed
    }
}

impl FromIterator<FileEntry> for Index {
    fn from_iter<I: IntoIterator<Item = FileEntry>>(iter: I) -> Self {
        let mut index = Index::new();
        for entry in iter {
            index.insert(entry);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nsync_types::ContentDigest;

    fn entry(path: &str, staged: bool) -> FileEntry {
        let mut e = FileEntry::new(path, ContentDigest::from_hash([1; 32]), Utc::now());
        e.staged = staged;
        e
    }

    #[test]
    fn new_index_is_empty() {
        let idx = Index::new();
        assert!(idx.is_empty());
        assert_eq!(idx.len(), 0);
        assert!(idx.staged_paths().is_empty());
    }

    #[test]
    fn insert_keys_by_entry_path() {
        let mut idx = Index::new();
        assert!(idx.insert(entry("a.md", false)).is_none());
        assert!(idx.insert(entry("a.md", true)).is_some());
        assert_eq!(idx.len(), 1);
        assert!(idx.get("a.md").unwrap().staged);
    }

    #[test]
    fn unstage_clears_flag() {
        let mut idx: Index = [entry("a.md", true), entry("b.md", false)].into_iter().collect();
        assert!(idx.unstage("a.md"));
        assert!(!idx.unstage("a.md"));
        assert!(!idx.unstage("b.md"));
        assert!(!idx.unstage("missing.md"));
        assert!(idx.staged_paths().is_empty());
    }

    #[test]
    fn unstage_all_reports_cleared_paths() {
        let mut idx: Index = [entry("a.md", true), entry("b.md", true), entry("c.md", false)]
            .into_iter()
            .collect();
        assert_eq!(idx.unstage_all(), vec!["a.md".to_string(), "b.md".to_string()]);
        assert!(idx.staged_paths().is_empty());
    }

    #[test]
    fn mark_synced_sets_timestamp_and_unstages() {
        let mut idx: Index = [entry("a.md", true)].into_iter().collect();
        let now = Utc::now();
        assert!(idx.mark_synced("a.md", now));
        let e = idx.get("a.md").unwrap();
        assert_eq!(e.last_synced, Some(now));
        assert!(!e.staged);
        assert!(!idx.mark_synced("missing.md", now));
    }

    #[test]
    fn serializes_as_plain_object() {
        let idx: Index = [entry("b.md", false), entry("a.md", true)].into_iter().collect();
        let json = serde_json::to_value(&idx).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["a.md", "b.md"]);
        assert_eq!(obj["a.md"]["staged"], true);
    }

    #[test]
    fn normalize_keys_trusts_the_key() {
        let mut idx = Index::new();
        let mut e = entry("wrong.md", false);
        idx.insert(e.clone());
        e.path = "other.md".into();
        idx.entries.insert("right.md".into(), e);
        assert_eq!(idx.normalize_keys(), 1);
        assert_eq!(idx.get("right.md").unwrap().path, "right.md");
    }
}
