//! On-disk persistence of the [`Index`].
//!
//! Layout under the working tree root:
//!
//! ```text
//! .notion-sync/
//!   index     JSON object { "<relpath>": FileEntry, ... }, 2-space indented
//!   hashes/   reserved, always present, may be empty
//! ```
//!
//! Saves never mutate the index file in place: the full document is written
//! to a temp file in the same directory, synced, and renamed over the target,
//! so a concurrent reader sees either the old or the new index, never a torn
//! one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{IndexError, IndexResult};
use crate::index::Index;

/// Metadata directory name at the working tree root.
pub const META_DIR: &str = ".notion-sync";
/// Index file name inside [`META_DIR`].
pub const INDEX_FILE: &str = "index";
/// Reserved directory inside [`META_DIR`].
pub const HASHES_DIR: &str = "hashes";

/// Loads and atomically saves the index for one working tree.
#[derive(Clone, Debug)]
pub struct IndexStore {
    meta_dir: PathBuf,
    index_path: PathBuf,
}

impl IndexStore {
    /// Store for the working tree rooted at `root`. Touches nothing on disk.
    pub fn new(root: &Path) -> Self {
        let meta_dir = root.join(META_DIR);
        let index_path = meta_dir.join(INDEX_FILE);
        Self {
            meta_dir,
            index_path,
        }
    }

    /// Path of the index file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Path of the metadata directory.
    pub fn meta_dir(&self) -> &Path {
        &self.meta_dir
    }

    /// Returns `true` if the index file exists.
    pub fn is_initialized(&self) -> bool {
        self.index_path.is_file()
    }

    /// Create the metadata layout and an empty index if none exists.
    ///
    /// Idempotent: an existing index is left untouched.
    pub fn initialize(&self) -> IndexResult<()> {
        let hashes = self.meta_dir.join(HASHES_DIR);
        fs::create_dir_all(&hashes).map_err(|e| IndexError::io(&hashes, e))?;
        if !self.index_path.exists() {
            self.save(&Index::new())?;
            debug!(path = %self.index_path.display(), "created empty index");
        }
        Ok(())
    }

    /// Load the current index, or an empty one if the file is absent.
    pub fn load(&self) -> IndexResult<Index> {
        let bytes = match fs::read(&self.index_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Index::new()),
            Err(e) => return Err(IndexError::io(&self.index_path, e)),
        };

        let mut index: Index =
            serde_json::from_slice(&bytes).map_err(|e| IndexError::CorruptIndex {
                path: self.index_path.clone(),
                reason: e.to_string(),
            })?;

        let fixed = index.normalize_keys();
        if fixed > 0 {
            warn!(fixed, "index entries had paths disagreeing with their keys");
        }
        Ok(index)
    }

    /// Atomically replace the on-disk index with `index`.
    pub fn save(&self, index: &Index) -> IndexResult<()> {
        fs::create_dir_all(&self.meta_dir).map_err(|e| IndexError::io(&self.meta_dir, e))?;

        let mut json = serde_json::to_vec_pretty(index).map_err(|e| IndexError::CorruptIndex {
            path: self.index_path.clone(),
            reason: format!("failed to encode index: {e}"),
        })?;
        json.push(b'\n');

        let mut tmp = tempfile::Builder::new()
            .prefix(".index-")
            .suffix(".tmp")
            .tempfile_in(&self.meta_dir)
            .map_err(|e| IndexError::io(&self.meta_dir, e))?;
        tmp.write_all(&json)
            .map_err(|e| IndexError::io(tmp.path(), e))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| IndexError::io(tmp.path(), e))?;
        tmp.persist(&self.index_path)
            .map_err(|e| IndexError::io(&self.index_path, e.error))?;

        debug!(entries = index.len(), path = %self.index_path.display(), "index saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::FileEntry;
    use chrono::{DateTime, Utc};
    use nsync_types::ContentDigest;
    use proptest::prelude::*;

    fn sample_index() -> Index {
        let mut a = FileEntry::new_staged("a.md", ContentDigest::from_hash([1; 32]), Utc::now());
        a.last_synced = Some(Utc::now());
        let b = FileEntry::new("docs/b.md", ContentDigest::from_hash([2; 32]), Utc::now());
        [a, b].into_iter().collect()
    }

    #[test]
    fn load_missing_index_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        assert!(!store.is_initialized());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn initialize_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.initialize().unwrap();

        assert!(dir.path().join(META_DIR).join(HASHES_DIR).is_dir());
        assert!(store.is_initialized());
        assert_eq!(fs::read_to_string(store.index_path()).unwrap(), "{}\n");
    }

    #[test]
    fn initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.initialize().unwrap();
        let index = sample_index();
        store.save(&index).unwrap();

        store.initialize().unwrap();
        assert_eq!(store.load().unwrap(), index);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        let index = sample_index();
        store.save(&index).unwrap();
        assert_eq!(store.load().unwrap(), index);
    }

    #[test]
    fn saved_file_is_two_space_indented_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.save(&sample_index()).unwrap();

        let text = fs::read_to_string(store.index_path()).unwrap();
        assert!(text.starts_with("{\n  \"a.md\": {\n    \"path\": \"a.md\""));
        assert!(text.contains("\"staged\": true"));
    }

    #[test]
    fn save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        store.initialize().unwrap();
        store.save(&sample_index()).unwrap();
        store.save(&Index::new()).unwrap();

        let mut names: Vec<_> = fs::read_dir(store.meta_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, vec![HASHES_DIR.to_string(), INDEX_FILE.to_string()]);
    }

    #[test]
    fn undecodable_index_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        fs::create_dir_all(store.meta_dir()).unwrap();
        fs::write(store.index_path(), b"{ not json").unwrap();

        assert!(matches!(
            store.load(),
            Err(IndexError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn empty_index_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path());
        fs::create_dir_all(store.meta_dir()).unwrap();
        fs::write(store.index_path(), b"").unwrap();
        assert!(matches!(store.load(), Err(IndexError::CorruptIndex { .. })));
    }

    fn arb_time() -> impl Strategy<Value = DateTime<Utc>> {
        (0i64..4_102_444_800, 0u32..1_000_000_000)
            .prop_map(|(secs, nanos)| DateTime::<Utc>::from_timestamp(secs, nanos).unwrap())
    }

    fn arb_entry() -> impl Strategy<Value = FileEntry> {
        (
            "[a-z]{1,8}(/[a-z0-9_-]{1,8}){0,2}\\.md",
            any::<[u8; 32]>(),
            arb_time(),
            proptest::option::of(arb_time()),
            any::<bool>(),
        )
            .prop_map(|(path, hash, last_modified, last_synced, staged)| FileEntry {
                path,
                hash: ContentDigest::from_hash(hash),
                last_modified,
                last_synced,
                staged,
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn index_roundtrips_through_disk(entries in proptest::collection::vec(arb_entry(), 0..12)) {
            let dir = tempfile::tempdir().unwrap();
            let store = IndexStore::new(dir.path());
            let index: Index = entries.into_iter().collect();
            store.save(&index).unwrap();
            prop_assert_eq!(store.load().unwrap(), index);
        }
    }
}
