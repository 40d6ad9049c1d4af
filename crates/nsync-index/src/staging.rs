//! The staging area: add, reset, mark-synced and status over one working tree.
//!
//! Every mutation goes through [`StagingArea::update`], which holds the writer
//! lock across re-read, mutate and save. Readers load a snapshot and never
//! write, except for the self-heal bumps that [`StagingArea::status`] routes
//! back through the writer after the scan.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use nsync_crypto::{ContentHasher, FileHasher};
use nsync_doc::{FrontMatterCodec, HeaderCodec};
use nsync_types::{ContentDigest, RelPath, TypeError};
use tracing::{debug, info, warn};

use crate::classify::ClassifyPolicy;
use crate::entry::{to_datetime, FileEntry};
use crate::error::{IndexError, IndexResult};
use crate::index::Index;
use crate::scanner::{StatusScanner, DEFAULT_WORKERS};
use crate::status::{FileStatus, StatusMap, WorkdirStatus};
use crate::store::{IndexStore, META_DIR};

/// Result of unstaging one path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The entry was staged and is now unstaged.
    Unstaged,
    /// The entry exists but was not staged.
    NotStaged,
    /// The path is not in the index.
    Untracked,
}

impl ResetOutcome {
    /// Returns `true` if nothing changed.
    pub fn is_noop(&self) -> bool {
        !matches!(self, Self::Unstaged)
    }
}

impl fmt::Display for ResetOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unstaged => f.write_str("unstaged"),
            Self::NotStaged => f.write_str("not staged"),
            Self::Untracked => f.write_str("not tracked"),
        }
    }
}

/// Content and mtime of a file as seen just before an index mutation.
struct Observed {
    path: String,
    hash: ContentDigest,
    mtime: DateTime<Utc>,
}

/// Change tracking for one working tree.
pub struct StagingArea {
    root: PathBuf,
    store: IndexStore,
    hasher: Arc<dyn FileHasher>,
    codec: Arc<dyn HeaderCodec>,
    policy: ClassifyPolicy,
    workers: usize,
    writer: Mutex<()>,
}

impl fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingArea")
            .field("root", &self.root)
            .field("policy", &self.policy)
            .field("workers", &self.workers)
            .finish()
    }
}

impl StagingArea {
    /// Staging area for the working tree at `root`, with the default hasher,
    /// header codec, classification windows and worker count.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            store: IndexStore::new(&root),
            root,
            hasher: Arc::new(ContentHasher::new()),
            codec: Arc::new(FrontMatterCodec),
            policy: ClassifyPolicy::default(),
            workers: DEFAULT_WORKERS,
            writer: Mutex::new(()),
        }
    }

    pub fn with_hasher(mut self, hasher: Arc<dyn FileHasher>) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn HeaderCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_policy(mut self, policy: ClassifyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// Create `.notion-sync/` and an empty index. Idempotent.
    pub fn initialize(&self) -> IndexResult<()> {
        let _guard = self.writer.lock().expect("index writer lock poisoned");
        self.store.initialize()?;
        info!(root = %self.root.display(), "initialized working tree");
        Ok(())
    }

    /// Stage one document with its current content.
    ///
    /// The index either gains the new entry or is left unchanged.
    pub fn add_file(&self, path: &str) -> IndexResult<FileEntry> {
        let mut added = self.add_files([path])?;
        Ok(added.remove(0))
    }

    /// Stage several documents in one index write.
    ///
    /// Every file is hashed before the index is touched; a missing file fails
    /// the whole batch.
    pub fn add_files<I, S>(&self, paths: I) -> IndexResult<Vec<FileEntry>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut observed = Vec::new();
        for path in paths {
            let rel = document_path(path.as_ref())?;
            match self.observe(&rel)? {
                Some(obs) => observed.push(obs),
                None => return Err(IndexError::FileNotFound(rel.into_string())),
            }
        }

        let added = self.update(|index| {
            observed
                .iter()
                .map(|obs| {
                    let mut entry = FileEntry::new_staged(&obs.path, obs.hash, obs.mtime);
                    entry.last_synced = index.get(&obs.path).and_then(|e| e.last_synced);
                    index.insert(entry.clone());
                    entry
                })
                .collect::<Vec<_>>()
        })?;

        for entry in &added {
            debug!(path = %entry.path, hash = %entry.hash.short_hex(), "staged");
        }
        Ok(added)
    }

    /// Unstage one path.
    pub fn reset_file(&self, path: &str) -> IndexResult<ResetOutcome> {
        let rel = RelPath::new(path)?;
        let outcome = self.update(|index| {
            if index.unstage(rel.as_str()) {
                ResetOutcome::Unstaged
            } else if index.contains(rel.as_str()) {
                ResetOutcome::NotStaged
            } else {
                ResetOutcome::Untracked
            }
        })?;
        if outcome.is_noop() {
            warn!(path = rel.as_str(), %outcome, "reset had nothing to do");
        }
        Ok(outcome)
    }

    /// Unstage every entry, returning the paths that were staged.
    pub fn reset_all(&self) -> IndexResult<Vec<String>> {
        let cleared = self.update(Index::unstage_all)?;
        debug!(count = cleared.len(), "unstaged all");
        Ok(cleared)
    }

    /// Paths currently staged.
    pub fn staged_files(&self) -> IndexResult<BTreeSet<String>> {
        Ok(self.store.load()?.staged_paths())
    }

    /// Record a successful push of `paths`.
    ///
    /// Tracked entries are unstaged and stamped with the sync time; when the
    /// file is still present its hash and mtime are refreshed. Untracked
    /// paths that exist on disk get a fresh synced entry. Returns the paths
    /// whose entries were written.
    pub fn mark_synced<I, S>(&self, paths: I) -> IndexResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets = Vec::new();
        for path in paths {
            let rel = document_path(path.as_ref())?;
            let observed = self.observe(&rel)?;
            targets.push((rel.into_string(), observed));
        }

        let now = Utc::now();
        let marked = self.update(|index| {
            let mut marked = Vec::new();
            for (path, observed) in &targets {
                if let (Some(entry), Some(obs)) = (index.get_mut(path), observed) {
                    entry.hash = obs.hash;
                    entry.last_modified = obs.mtime;
                }
                if index.mark_synced(path, now) {
                    marked.push(path.clone());
                } else if let Some(obs) = observed {
                    let mut entry = FileEntry::new(&obs.path, obs.hash, obs.mtime);
                    entry.last_synced = Some(now);
                    index.insert(entry);
                    marked.push(path.clone());
                } else {
                    debug!(path = %path, "mark synced: not tracked and not on disk");
                }
            }
            marked
        })?;

        debug!(count = marked.len(), "marked synced");
        Ok(marked)
    }

    /// Status of every actionable document, keyed by path.
    ///
    /// Never contains `Unmodified`. Walk failures are errors; per-file
    /// failures are logged and skipped.
    pub fn status(&self) -> IndexResult<StatusMap> {
        let index = self.store.load()?;
        let scanner = StatusScanner::new(
            &self.root,
            self.workers,
            self.policy,
            Arc::clone(&self.hasher),
            Arc::clone(&self.codec),
        );
        let scan = scanner.scan(&index, Utc::now())?;
        let mut statuses = scan.statuses;

        for entry in index.entries() {
            let abs = self.root.join(&entry.path);
            if !abs.is_file() {
                statuses.insert(entry.path.clone(), FileStatus::Deleted);
            } else if entry.staged && !statuses.contains_key(&entry.path) {
                statuses.insert(entry.path.clone(), FileStatus::Staged);
            }
        }

        if !scan.healed.is_empty() {
            self.apply_heals(&index, &scan.healed);
        }
        Ok(statuses)
    }

    /// [`status`](Self::status) grouped for display.
    pub fn workdir_status(&self) -> IndexResult<WorkdirStatus> {
        Ok(WorkdirStatus::from_map(&self.status()?))
    }

    /// Snapshot of the whole index.
    pub fn entries(&self) -> IndexResult<Index> {
        self.store.load()
    }

    /// Snapshot of one entry.
    pub fn entry(&self, path: &str) -> IndexResult<Option<FileEntry>> {
        let rel = RelPath::new(path)?;
        Ok(self.store.load()?.get(rel.as_str()).cloned())
    }

    /// Bump `last_modified` for entries whose content was confirmed
    /// unchanged. Best effort: failures are logged.
    fn apply_heals(&self, snapshot: &Index, healed: &[(String, DateTime<Utc>)]) {
        let result = self.update(|index| {
            let mut bumped = 0usize;
            for (path, mtime) in healed {
                let Some(seen) = snapshot.get(path) else {
                    continue;
                };
                if let Some(entry) = index.get_mut(path) {
                    if entry.hash == seen.hash && *mtime > entry.last_modified {
                        entry.last_modified = *mtime;
                        bumped += 1;
                    }
                }
            }
            bumped
        });
        match result {
            Ok(bumped) => debug!(bumped, "self-healed index timestamps"),
            Err(e) => warn!(error = %e, "failed to persist self-heal"),
        }
    }

    /// Hash and stat a document. `Ok(None)` if it does not exist.
    fn observe(&self, rel: &RelPath) -> IndexResult<Option<Observed>> {
        let abs = rel.to_path(&self.root);
        let metadata = match fs::metadata(&abs) {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(IndexError::io(&abs, e)),
        };
        let mtime = metadata.modified().map_err(|e| IndexError::io(&abs, e))?;
        let hash = self.hasher.hash_file(&abs)?;
        Ok(Some(Observed {
            path: rel.as_str().to_string(),
            hash,
            mtime: to_datetime(mtime),
        }))
    }

    /// Serialized read-modify-write of the index. Saves only if `f` changed
    /// something.
    fn update<R>(&self, f: impl FnOnce(&mut Index) -> R) -> IndexResult<R> {
        let _guard = self.writer.lock().expect("index writer lock poisoned");
        let mut index = self.store.load()?;
        let before = index.clone();
        let result = f(&mut index);
        if index != before {
            self.store.save(&index)?;
        }
        Ok(result)
    }
}

/// Parse a working-tree path, refusing anything under `.notion-sync/`.
fn document_path(path: &str) -> IndexResult<RelPath> {
    let rel = RelPath::new(path)?;
    if rel.as_str().split('/').next() == Some(META_DIR) {
        return Err(TypeError::InvalidPath {
            path: path.to_string(),
            reason: format!("{META_DIR} holds sync metadata, not documents"),
        }
        .into());
    }
    Ok(rel)
}
