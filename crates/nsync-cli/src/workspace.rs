//! The markdown root as seen from the command line: config, staging area and
//! path resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use nsync_config::Config;
use nsync_doc::{FrontMatterCodec, HeaderCodec};
use nsync_index::{collect_documents, ClassifyPolicy, StagingArea};
use nsync_sync::{DocumentDriver, ProgressBus, UnlinkedClient};
use nsync_types::{PageId, RelPath};
use tracing::debug;

/// A document whose header names a remote page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedDocument {
    pub path: RelPath,
    pub page_id: PageId,
}

pub struct Workspace {
    root: PathBuf,
    config: Config,
    staging: Arc<StagingArea>,
}

impl Workspace {
    /// Open the configured markdown root. The directory must exist.
    pub fn open(config: Config) -> anyhow::Result<Self> {
        let configured = &config.directories.markdown_root;
        let root = configured
            .canonicalize()
            .with_context(|| format!("markdown root {} is not accessible", configured.display()))?;

        let policy = ClassifyPolicy {
            fresh_window: config.fresh_window(),
            synced_window: config.synced_window(),
        };
        let staging = StagingArea::new(&root)
            .with_policy(policy)
            .with_workers(config.status.workers.max(1));
        debug!(root = %root.display(), "workspace opened");

        Ok(Self {
            root,
            config,
            staging: Arc::new(staging),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    pub fn staging_arc(&self) -> Arc<StagingArea> {
        Arc::clone(&self.staging)
    }

    pub fn require_initialized(&self) -> anyhow::Result<()> {
        if !self.staging.store().is_initialized() {
            bail!(
                "{} is not initialized; run `notion-sync init` first",
                self.root.display()
            );
        }
        Ok(())
    }

    /// Driver for this root. No remote client is linked in, so remote calls
    /// fail with a remote error.
    pub fn driver(&self, progress: ProgressBus) -> anyhow::Result<DocumentDriver<UnlinkedClient>> {
        let parent = self.config.parent_page()?;
        Ok(DocumentDriver::new(&self.root, UnlinkedClient)
            .with_progress(progress)
            .with_parent(parent))
    }

    /// Resolve a path given on the command line (relative to the current
    /// directory) to a path under the root.
    pub fn rel_path(&self, input: &Path) -> anyhow::Result<RelPath> {
        let absolute = if input.is_absolute() {
            input.to_path_buf()
        } else {
            std::env::current_dir()
                .context("cannot read the current directory")?
                .join(input)
        };
        // Canonical form only exists for files that are present.
        let absolute = absolute.canonicalize().unwrap_or(absolute);
        RelPath::from_path(&self.root, &absolute)
            .with_context(|| format!("{} is not inside {}", input.display(), self.root.display()))
    }

    /// Expand one `add` argument into root-relative paths.
    ///
    /// `.` selects every modified or new document; glob patterns are matched
    /// against markdown files; directories are walked for markdown files.
    pub fn expand(&self, arg: &str) -> anyhow::Result<Vec<String>> {
        if arg == "." {
            return Ok(self.staging.workdir_status()?.addable());
        }
        if arg.contains(['*', '?', '[']) {
            let mut paths = Vec::new();
            let matches =
                glob::glob(arg).with_context(|| format!("invalid glob pattern {arg:?}"))?;
            for entry in matches {
                let path = entry?;
                if path.is_file() && is_markdown(&path) {
                    paths.push(self.rel_path(&path)?.into_string());
                }
            }
            return Ok(paths);
        }
        let path = Path::new(arg);
        if path.is_dir() {
            return self.documents_under(path);
        }
        Ok(vec![self.rel_path(path)?.into_string()])
    }

    /// Markdown documents under `dir`, root-relative.
    pub fn documents_under(&self, dir: &Path) -> anyhow::Result<Vec<String>> {
        let mut paths = Vec::new();
        for rel in collect_documents(dir)? {
            paths.push(self.rel_path(&dir.join(rel))?.into_string());
        }
        Ok(paths)
    }

    /// Narrow a `sync` run to one file or one directory; `None` means the
    /// whole root.
    pub fn scope(
        &self,
        file: Option<&Path>,
        directory: Option<&Path>,
    ) -> anyhow::Result<Option<BTreeSet<String>>> {
        match (file, directory) {
            (Some(file), _) => Ok(Some([self.rel_path(file)?.into_string()].into())),
            (None, Some(dir)) => {
                if !dir.is_dir() {
                    bail!("{} is not a directory", dir.display());
                }
                Ok(Some(self.documents_under(dir)?.into_iter().collect()))
            }
            (None, None) => Ok(None),
        }
    }

    /// Tracked documents that carry a page id, in path order.
    pub fn linked_documents(&self) -> anyhow::Result<Vec<LinkedDocument>> {
        let codec = FrontMatterCodec;
        let mut linked = Vec::new();
        for entry in self.staging.entries()?.entries() {
            let path = RelPath::new(&entry.path)?;
            let absolute = path.to_path(&self.root);
            if !absolute.is_file() {
                continue;
            }
            let doc = codec.read_file(&absolute)?;
            if let Some(page_id) = doc.header.page_id()? {
                linked.push(LinkedDocument { path, page_id });
            }
        }
        Ok(linked)
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}
