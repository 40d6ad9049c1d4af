//! Parallel status scan of the working tree.
//!
//! The scanner walks the root, keeps markdown files outside `.notion-sync/`,
//! and classifies them on a fixed pool of `min(workers, file_count)` scoped
//! threads. Workers share the index snapshot read-only and write results into
//! one mutex-protected [`ScanOutput`]. The scanner never writes the index:
//! self-heal bumps are returned to the caller, which folds them into a single
//! save.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::{DateTime, Utc};
use nsync_crypto::FileHasher;
use nsync_doc::HeaderCodec;
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use crate::classify::ClassifyPolicy;
use crate::entry::to_datetime;
use crate::error::IndexResult;
use crate::index::Index;
use crate::status::{FileStatus, StatusMap};
use crate::store::META_DIR;

/// Default size of the classification worker pool.
pub const DEFAULT_WORKERS: usize = 5;

/// Extension of documents the scanner considers.
const DOCUMENT_EXTENSION: &str = "md";

/// Result of one scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutput {
    /// Actionable statuses of files present in the working tree.
    pub statuses: StatusMap,
    /// `(path, mtime)` pairs whose content matched the index despite a newer
    /// mtime.
    pub healed: Vec<(String, DateTime<Utc>)>,
}

/// Walk `root` and return the relative paths of every markdown document,
/// sorted, skipping the `.notion-sync/` subtree.
///
/// A failure to read the root itself is an error; unreadable entries deeper
/// in the tree are logged and skipped.
pub fn collect_documents(root: &Path) -> IndexResult<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == META_DIR));

    for item in walker {
        let entry = match item {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                warn!(error = %err, "skipping unreadable path during scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_document = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION));
        if !is_document {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        files.push(to_slash(relative));
    }

    files.sort();
    Ok(files)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Classifies working-tree documents against an index snapshot.
pub struct StatusScanner {
    root: PathBuf,
    workers: usize,
    policy: ClassifyPolicy,
    hasher: Arc<dyn FileHasher>,
    codec: Arc<dyn HeaderCodec>,
}

impl std::fmt::Debug for StatusScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusScanner")
            .field("root", &self.root)
            .field("workers", &self.workers)
            .field("policy", &self.policy)
            .finish()
    }
}

impl StatusScanner {
    pub fn new(
        root: impl Into<PathBuf>,
        workers: usize,
        policy: ClassifyPolicy,
        hasher: Arc<dyn FileHasher>,
        codec: Arc<dyn HeaderCodec>,
    ) -> Self {
        Self {
            root: root.into(),
            workers: workers.max(1),
            policy,
            hasher,
            codec,
        }
    }

    /// Classify every document under the root against `index`.
    ///
    /// Only files present on disk are reported here; deletions are the
    /// caller's sweep over the index.
    pub fn scan(&self, index: &Index, now: DateTime<Utc>) -> IndexResult<ScanOutput> {
        let files = collect_documents(&self.root)?;
        let worker_count = self.workers.min(files.len());
        debug!(files = files.len(), workers = worker_count, "status scan started");

        let output = Mutex::new(ScanOutput::default());
        let next = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|| loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(path) = files.get(i) else {
                        break;
                    };
                    let (status, healed) = self.classify_file(index, path, now);
                    if !status.is_actionable() && healed.is_none() {
                        continue;
                    }
                    let mut out = output.lock().expect("scan output lock poisoned");
                    if let Some(mtime) = healed {
                        out.healed.push((path.clone(), mtime));
                    }
                    if status.is_actionable() {
                        out.statuses.insert(path.clone(), status);
                    }
                });
            }
        });

        let mut output = output.into_inner().expect("scan output lock poisoned");
        output.healed.sort();
        Ok(output)
    }

    fn classify_file(
        &self,
        index: &Index,
        path: &str,
        now: DateTime<Utc>,
    ) -> (FileStatus, Option<DateTime<Utc>>) {
        let abs = self.root.join(path);
        let result = self.try_classify(index, path, &abs, now);
        match result {
            Ok((FileStatus::Unknown { reason }, _)) | Err(reason) => {
                warn!(path, %reason, "could not classify file");
                (FileStatus::Unknown { reason }, None)
            }
            Ok(classified) => {
                trace!(path, status = %classified.0, "classified");
                classified
            }
        }
    }

    fn try_classify(
        &self,
        index: &Index,
        path: &str,
        abs: &Path,
        now: DateTime<Utc>,
    ) -> Result<(FileStatus, Option<DateTime<Utc>>), String> {
        let metadata = fs::metadata(abs).map_err(|e| e.to_string())?;
        let mtime = to_datetime(metadata.modified().map_err(|e| e.to_string())?);

        match index.get(path) {
            Some(entry) => {
                let classified = self
                    .policy
                    .classify_tracked(entry, mtime, abs, self.hasher.as_ref())
                    .map_err(|e| e.to_string())?;
                Ok((classified.status, classified.healed))
            }
            None => {
                // Only the page id key matters here; undecodable bytes are
                // replaced rather than rejected.
                let bytes = fs::read(abs).map_err(|e| e.to_string())?;
                let doc = self.codec.parse(&String::from_utf8_lossy(&bytes));
                let status = self
                    .policy
                    .classify_untracked(mtime, now, doc.notion_id().is_some());
                Ok((status, None))
            }
        }
    }
}
