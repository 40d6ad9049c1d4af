use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use nsync_index::StagingArea;
use nsync_sync::SyncDriver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::debounce::PathHandler;

/// Pushes a quiet document and records the sync in the index.
///
/// Failures are logged and leave the index untouched.
pub struct PushHandler {
    driver: Arc<dyn SyncDriver>,
    staging: Arc<StagingArea>,
}

impl PushHandler {
    pub fn new(driver: Arc<dyn SyncDriver>, staging: Arc<StagingArea>) -> Self {
        Self { driver, staging }
    }
}

#[async_trait]
impl PathHandler for PushHandler {
    async fn handle(&self, token: CancellationToken, path: PathBuf) {
        if token.is_cancelled() {
            debug!(path = %path.display(), "shutting down, push skipped");
            return;
        }

        let outcome = match self.driver.push(&token, &path).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_cancelled() => {
                debug!(path = %path.display(), "push cancelled");
                return;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "push failed");
                return;
            }
        };

        let staging = Arc::clone(&self.staging);
        let synced = outcome.path.clone();
        let result = tokio::task::spawn_blocking(move || staging.mark_synced([synced])).await;
        match result {
            Ok(Ok(_)) => info!(path = %outcome.path, page_id = %outcome.page_id, "synced"),
            Ok(Err(err)) => warn!(path = %outcome.path, error = %err, "pushed but index update failed"),
            Err(err) => warn!(path = %outcome.path, error = %err, "index update task failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nsync_sync::{PageRef, PullRequest, PulledDocument, PushOutcome, SyncError, SyncResult};
    use nsync_types::PageId;

    struct FakeDriver {
        root: PathBuf,
        pushes: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SyncDriver for FakeDriver {
        async fn push(&self, token: &CancellationToken, path: &Path) -> SyncResult<PushOutcome> {
            if token.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            self.pushes.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SyncError::Remote("offline".into()));
            }
            let rel = path.strip_prefix(&self.root).unwrap_or(path);
            Ok(PushOutcome {
                path: rel.to_string_lossy().into_owned(),
                page_id: PageId::parse("0123456789abcdef0123456789abcdef").unwrap(),
                created: true,
            })
        }

        async fn pull(
            &self,
            _token: &CancellationToken,
            request: &PullRequest,
        ) -> SyncResult<PulledDocument> {
            let PageRef::Id(id) = &request.page else {
                return Err(SyncError::InvalidInput("id required".into()));
            };
            Err(SyncError::Remote(format!("cannot pull {id}")))
        }
    }

    fn setup(fail: bool) -> (tempfile::TempDir, Arc<FakeDriver>, Arc<StagingArea>, PushHandler) {
        let dir = tempfile::tempdir().unwrap();
        let staging = Arc::new(StagingArea::new(dir.path()));
        staging.initialize().unwrap();
        fs::write(dir.path().join("a.md"), "# A\n").unwrap();
        staging.add_file("a.md").unwrap();

        let driver = Arc::new(FakeDriver {
            root: dir.path().to_path_buf(),
            pushes: AtomicUsize::new(0),
            fail,
        });
        let handler = PushHandler::new(driver.clone(), Arc::clone(&staging));
        (dir, driver, staging, handler)
    }

    #[tokio::test]
    async fn successful_push_marks_synced() {
        let (dir, driver, staging, handler) = setup(false);
        handler
            .handle(CancellationToken::new(), dir.path().join("a.md"))
            .await;

        assert_eq!(driver.pushes.load(Ordering::SeqCst), 1);
        let entry = staging.entry("a.md").unwrap().unwrap();
        assert!(entry.is_synced());
        assert!(!entry.staged);
    }

    #[tokio::test]
    async fn failed_push_leaves_index_untouched() {
        let (dir, driver, staging, handler) = setup(true);
        let before = staging.entries().unwrap();
        handler
            .handle(CancellationToken::new(), dir.path().join("a.md"))
            .await;

        assert_eq!(driver.pushes.load(Ordering::SeqCst), 1);
        assert_eq!(staging.entries().unwrap(), before);
    }

    #[tokio::test]
    async fn cancelled_token_skips_push() {
        let (dir, driver, staging, handler) = setup(false);
        let token = CancellationToken::new();
        token.cancel();
        handler.handle(token, dir.path().join("a.md")).await;

        assert_eq!(driver.pushes.load(Ordering::SeqCst), 0);
        assert!(staging.staged_files().unwrap().contains("a.md"));
    }
}
