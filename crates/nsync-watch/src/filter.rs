//! Which filesystem events reach the debouncer.

use std::path::{Path, PathBuf};

use glob::Pattern;
use notify::event::{EventKind, ModifyKind};
use notify::Event;

use crate::error::{WatchError, WatchResult};

const DOCUMENT_EXTENSION: &str = "md";

/// Accepts data writes to markdown documents that match no exclude pattern.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    root: PathBuf,
    exclude: Vec<Pattern>,
}

impl EventFilter {
    /// Compile `patterns`. Paths are also matched relative to `root`.
    pub fn new<S: AsRef<str>>(root: impl Into<PathBuf>, patterns: &[S]) -> WatchResult<Self> {
        let exclude = patterns
            .iter()
            .map(|p| {
                Pattern::new(p.as_ref()).map_err(|source| WatchError::InvalidPattern {
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<WatchResult<Vec<_>>>()?;
        Ok(Self {
            root: root.into(),
            exclude,
        })
    }

    /// Paths of `event` that should be debounced. Empty for non-write
    /// events.
    pub fn accept(&self, event: &Event) -> Vec<PathBuf> {
        if !is_write(&event.kind) {
            return Vec::new();
        }
        event
            .paths
            .iter()
            .filter(|p| self.accepts_path(p))
            .cloned()
            .collect()
    }

    /// Document extension check followed by the exclude patterns.
    pub fn accepts_path(&self, path: &Path) -> bool {
        let is_document = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(DOCUMENT_EXTENSION));
        is_document && !self.is_excluded(path)
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).ok();
        self.exclude.iter().any(|pattern| {
            pattern.matches_path(path) || relative.is_some_and(|rel| pattern.matches_path(rel))
        })
    }
}

/// Only content modifications count as writes.
pub fn is_write(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}
