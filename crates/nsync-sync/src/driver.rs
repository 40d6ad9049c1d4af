//! The sync driver: moves documents between the working tree and the remote
//! service.
//!
//! [`SyncDriver`] is the contract the watcher and the command shell call.
//! [`DocumentDriver`] implements it on top of a [`RemoteClient`] and the
//! header codec. Drivers never touch the index; callers record success with
//! `StagingArea::mark_synced`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use nsync_doc::{Document, FrontMatterCodec, Header, HeaderCodec};
use nsync_types::{PageId, RelPath, SyncDirection};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::progress::{ProgressBus, ProgressEvent};
use crate::remote::{PageDraft, RemoteClient};

/// Result of a successful push.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushOutcome {
    /// Working-tree relative path of the pushed document.
    pub path: String,
    pub page_id: PageId,
    /// The remote page was created by this push.
    pub created: bool,
}

/// Which remote page to pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageRef {
    Id(PageId),
    Title(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequest {
    pub page: PageRef,
    /// Target file; defaults to a slug of the page title under the root.
    pub output: Option<PathBuf>,
}

/// Result of a successful pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PulledDocument {
    pub path: String,
    pub page_id: PageId,
    pub title: String,
}

/// Performs remote pushes and pulls.
///
/// Calls resolve when the operation finishes. A cancelled token aborts the
/// operation with [`SyncError::Cancelled`] and leaves local state untouched.
#[async_trait]
pub trait SyncDriver: Send + Sync {
    async fn push(&self, token: &CancellationToken, path: &Path) -> SyncResult<PushOutcome>;

    async fn pull(
        &self,
        token: &CancellationToken,
        request: &PullRequest,
    ) -> SyncResult<PulledDocument>;
}

/// [`SyncDriver`] backed by a [`RemoteClient`].
pub struct DocumentDriver<C> {
    root: PathBuf,
    client: C,
    codec: Arc<dyn HeaderCodec>,
    progress: ProgressBus,
    parent: Option<PageId>,
}

impl<C: RemoteClient> DocumentDriver<C> {
    pub fn new(root: impl Into<PathBuf>, client: C) -> Self {
        Self {
            root: root.into(),
            client,
            codec: Arc::new(FrontMatterCodec),
            progress: ProgressBus::default(),
            parent: None,
        }
    }

    pub fn with_codec(mut self, codec: Arc<dyn HeaderCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_progress(mut self, progress: ProgressBus) -> Self {
        self.progress = progress;
        self
    }

    /// Parent page for documents pushed for the first time.
    pub fn with_parent(mut self, parent: Option<PageId>) -> Self {
        self.parent = parent;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn progress(&self) -> &ProgressBus {
        &self.progress
    }

    async fn push_document(
        &self,
        token: &CancellationToken,
        rel: &RelPath,
        abs: &Path,
    ) -> SyncResult<PushOutcome> {
        let mut doc = self.codec.read_file(abs)?;
        let existing = doc.header.page_id()?;
        let title = doc.title().unwrap_or_else(|| file_stem(rel));

        let draft = PageDraft {
            page_id: existing,
            parent: self.parent,
            title,
            body: doc.body.clone(),
        };
        let page_id = cancellable(token, self.client.upsert_page(&draft)).await?;

        if existing != Some(page_id) {
            doc.set_page_id(&page_id);
            self.codec.write_file(abs, &doc)?;
            debug!(path = rel.as_str(), page_id = %page_id, "recorded page id in header");
        }

        Ok(PushOutcome {
            path: rel.as_str().to_string(),
            page_id,
            created: existing.is_none(),
        })
    }

    async fn pull_document(
        &self,
        token: &CancellationToken,
        request: &PullRequest,
    ) -> SyncResult<PulledDocument> {
        let page_id = match &request.page {
            PageRef::Id(id) => *id,
            PageRef::Title(title) => cancellable(token, self.client.find_page(title))
                .await?
                .ok_or_else(|| SyncError::InvalidInput(format!("no page titled {title:?}")))?,
        };
        let page = cancellable(token, self.client.fetch_page(&page_id)).await?;

        let rel = match &request.output {
            Some(output) => RelPath::from_path(&self.root, output)?,
            None => RelPath::new(&format!("{}.md", slugify(&page.title, &page_id)))?,
        };
        let abs = rel.to_path(&self.root);

        let mut doc = if abs.is_file() {
            let mut local = self.codec.read_file(&abs)?;
            local.body = page.body.clone();
            local
        } else {
            let mut header = Header::new();
            if !page.title.is_empty() {
                header.set("title", page.title.clone());
            }
            Document::new(header, page.body.clone())
        };
        doc.set_page_id(&page.id);
        self.codec.write_file(&abs, &doc)?;

        Ok(PulledDocument {
            path: rel.into_string(),
            page_id: page.id,
            title: page.title,
        })
    }

    fn resolve(&self, path: &Path) -> SyncResult<(RelPath, PathBuf)> {
        let rel = RelPath::from_path(&self.root, path)?;
        let abs = rel.to_path(&self.root);
        Ok((rel, abs))
    }
}

#[async_trait]
impl<C: RemoteClient> SyncDriver for DocumentDriver<C> {
    async fn push(&self, token: &CancellationToken, path: &Path) -> SyncResult<PushOutcome> {
        let (rel, abs) = self.resolve(path)?;
        if token.is_cancelled() {
            debug!(path = rel.as_str(), "push skipped: cancelled");
            return Err(SyncError::Cancelled);
        }

        let direction = SyncDirection::Push;
        self.progress.emit(ProgressEvent::Started {
            path: rel.as_str().to_string(),
            direction,
        });

        match self.push_document(token, &rel, &abs).await {
            Ok(outcome) => {
                info!(path = %outcome.path, page_id = %outcome.page_id, created = outcome.created, "pushed");
                self.progress.emit(ProgressEvent::Completed {
                    path: outcome.path.clone(),
                    direction,
                    page_id: outcome.page_id,
                });
                Ok(outcome)
            }
            Err(err) => {
                warn!(path = rel.as_str(), error = %err, "push failed");
                self.progress.emit(ProgressEvent::Failed {
                    path: rel.into_string(),
                    direction,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn pull(
        &self,
        token: &CancellationToken,
        request: &PullRequest,
    ) -> SyncResult<PulledDocument> {
        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        let label = match &request.page {
            PageRef::Id(id) => id.to_string(),
            PageRef::Title(title) => title.clone(),
        };
        let direction = SyncDirection::Pull;
        self.progress.emit(ProgressEvent::Started {
            path: label.clone(),
            direction,
        });

        match self.pull_document(token, request).await {
            Ok(pulled) => {
                info!(path = %pulled.path, page_id = %pulled.page_id, "pulled");
                self.progress.emit(ProgressEvent::Completed {
                    path: pulled.path.clone(),
                    direction,
                    page_id: pulled.page_id,
                });
                Ok(pulled)
            }
            Err(err) => {
                warn!(page = %label, error = %err, "pull failed");
                self.progress.emit(ProgressEvent::Failed {
                    path: label,
                    direction,
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

/// Race `fut` against the token.
async fn cancellable<T>(
    token: &CancellationToken,
    fut: impl Future<Output = SyncResult<T>>,
) -> SyncResult<T> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SyncError::Cancelled),
        result = fut => result,
    }
}

fn file_stem(rel: &RelPath) -> String {
    Path::new(rel.as_str())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel.as_str().to_string())
}

/// Lowercase ASCII slug of `title`; falls back to the page id.
fn slugify(title: &str, id: &PageId) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    if slug.is_empty() {
        id.simple()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use crate::remote::RemotePage;

    #[derive(Default)]
    struct MockClient {
        pages: Mutex<HashMap<PageId, RemotePage>>,
        upserts: AtomicUsize,
        fail: bool,
    }

    impl MockClient {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn page(&self, id: &PageId) -> Option<RemotePage> {
            self.pages.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl RemoteClient for MockClient {
        async fn upsert_page(&self, draft: &PageDraft) -> SyncResult<PageId> {
            if self.fail {
                return Err(SyncError::Remote("service unavailable".into()));
            }
            let n = self.upserts.fetch_add(1, Ordering::SeqCst) as u128;
            let id = draft
                .page_id
                .unwrap_or_else(|| PageId::from(Uuid::from_u128(0xabc0 + n)));
            self.pages.lock().unwrap().insert(
                id,
                RemotePage {
                    id,
                    title: draft.title.clone(),
                    body: draft.body.clone(),
                    last_edited: Utc::now(),
                },
            );
            Ok(id)
        }

        async fn fetch_page(&self, id: &PageId) -> SyncResult<RemotePage> {
            self.page(id)
                .ok_or_else(|| SyncError::Remote(format!("page {id} not found")))
        }

        async fn find_page(&self, title: &str) -> SyncResult<Option<PageId>> {
            Ok(self
                .pages
                .lock()
                .unwrap()
                .values()
                .find(|p| p.title == title)
                .map(|p| p.id))
        }
    }

    /// Never answers.
    struct HangingClient;

    #[async_trait]
    impl RemoteClient for HangingClient {
        async fn upsert_page(&self, _draft: &PageDraft) -> SyncResult<PageId> {
            std::future::pending().await
        }

        async fn fetch_page(&self, _id: &PageId) -> SyncResult<RemotePage> {
            std::future::pending().await
        }

        async fn find_page(&self, _title: &str) -> SyncResult<Option<PageId>> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn push_new_document_records_page_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "# Hello\n\nbody\n").unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());

        let outcome = driver
            .push(&CancellationToken::new(), Path::new("a.md"))
            .await
            .unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.path, "a.md");

        let text = fs::read_to_string(dir.path().join("a.md")).unwrap();
        assert!(text.starts_with(&format!("---\nnotion_id: {}\n---\n", outcome.page_id.simple())));
        assert!(text.ends_with("# Hello\n\nbody\n"));

        let page = driver.client().page(&outcome.page_id).unwrap();
        assert_eq!(page.title, "Hello");
        assert_eq!(page.body, "# Hello\n\nbody\n");
    }

    #[tokio::test]
    async fn push_existing_document_reuses_page_id() {
        let dir = tempfile::tempdir().unwrap();
        let id = PageId::parse("0123456789abcdef0123456789abcdef").unwrap();
        let text = format!("---\ntitle: \"Kept\"\nnotion_page_id: {}\n---\nbody\n", id.simple());
        fs::write(dir.path().join("b.md"), &text).unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());

        let abs = dir.path().join("b.md");
        let outcome = driver.push(&CancellationToken::new(), &abs).await.unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.page_id, id);
        assert_eq!(fs::read_to_string(&abs).unwrap(), text);
        assert_eq!(driver.client().page(&id).unwrap().title, "Kept");
    }

    #[tokio::test]
    async fn remote_failure_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "plain\n").unwrap();
        let bus = ProgressBus::new(8);
        let mut rx = bus.subscribe();
        let driver = DocumentDriver::new(dir.path(), MockClient::failing()).with_progress(bus);

        let err = driver
            .push(&CancellationToken::new(), Path::new("a.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Remote(_)));
        assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), "plain\n");

        assert!(matches!(rx.recv().await.unwrap(), ProgressEvent::Started { .. }));
        assert!(matches!(rx.recv().await.unwrap(), ProgressEvent::Failed { .. }));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());
        let err = driver
            .push(&CancellationToken::new(), Path::new("gone.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
    }

    #[tokio::test]
    async fn path_outside_root_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());
        let err = driver
            .push(&CancellationToken::new(), Path::new("/elsewhere/a.md"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn cancelled_token_skips_remote_call() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "x").unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = driver.push(&token, Path::new("a.md")).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(driver.client().upserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_push() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "x").unwrap();
        let driver = DocumentDriver::new(dir.path(), HangingClient);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = driver.push(&token, Path::new("a.md")).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(fs::read_to_string(dir.path().join("a.md")).unwrap(), "x");
    }

    #[tokio::test]
    async fn pull_by_title_writes_new_document() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());
        let id = driver
            .client()
            .upsert_page(&PageDraft {
                page_id: None,
                parent: None,
                title: "Meeting Notes: Q3".into(),
                body: "remote body\n".into(),
            })
            .await
            .unwrap();

        let pulled = driver
            .pull(
                &CancellationToken::new(),
                &PullRequest {
                    page: PageRef::Title("Meeting Notes: Q3".into()),
                    output: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(pulled.path, "meeting-notes-q3.md");
        assert_eq!(pulled.page_id, id);

        let doc = FrontMatterCodec
            .read_file(&dir.path().join("meeting-notes-q3.md"))
            .unwrap();
        assert_eq!(doc.header.page_id().unwrap(), Some(id));
        assert_eq!(doc.header.get("title"), Some("Meeting Notes: Q3"));
        assert_eq!(doc.body, "remote body\n");
    }

    #[tokio::test]
    async fn pull_into_existing_file_keeps_header_fields() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());
        let id = driver
            .client()
            .upsert_page(&PageDraft {
                page_id: None,
                parent: None,
                title: "T".into(),
                body: "new body\n".into(),
            })
            .await
            .unwrap();
        fs::write(dir.path().join("t.md"), "---\ntags: a, b\n---\nold body\n").unwrap();

        driver
            .pull(
                &CancellationToken::new(),
                &PullRequest {
                    page: PageRef::Id(id),
                    output: Some(PathBuf::from("t.md")),
                },
            )
            .await
            .unwrap();

        let text = fs::read_to_string(dir.path().join("t.md")).unwrap();
        assert_eq!(
            text,
            format!("---\ntags: a, b\nnotion_id: {}\n---\nnew body\n", id.simple())
        );
    }

    #[tokio::test]
    async fn pull_unknown_title_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let driver = DocumentDriver::new(dir.path(), MockClient::default());
        let err = driver
            .pull(
                &CancellationToken::new(),
                &PullRequest {
                    page: PageRef::Title("nope".into()),
                    output: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
    }

    #[test]
    fn slugify_titles() {
        let id = PageId::from(Uuid::from_u128(1));
        assert_eq!(slugify("Hello, World!", &id), "hello-world");
        assert_eq!(slugify("  --  ", &id), id.simple());
    }
}
