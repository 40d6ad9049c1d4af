use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nsync_types::PageId;

use crate::error::{SyncError, SyncResult};

/// Content to create or replace on the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageDraft {
    /// Existing page to overwrite; `None` creates a new page.
    pub page_id: Option<PageId>,
    /// Parent for newly created pages.
    pub parent: Option<PageId>,
    pub title: String,
    /// Markdown body without the header block.
    pub body: String,
}

/// A page as fetched from the remote service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemotePage {
    pub id: PageId,
    pub title: String,
    pub body: String,
    pub last_edited: DateTime<Utc>,
}

/// Client interface for the remote document service.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Create or overwrite a page, returning its id.
    async fn upsert_page(&self, draft: &PageDraft) -> SyncResult<PageId>;
    async fn fetch_page(&self, id: &PageId) -> SyncResult<RemotePage>;
    /// Look up a page by exact title.
    async fn find_page(&self, title: &str) -> SyncResult<Option<PageId>>;
}

/// Client used when no remote service is linked into the binary.
///
/// Every call fails with [`SyncError::Remote`].
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlinkedClient;

impl UnlinkedClient {
    fn unavailable<T>(&self) -> SyncResult<T> {
        Err(SyncError::Remote(
            "no remote client is linked into this build".into(),
        ))
    }
}

#[async_trait]
impl RemoteClient for UnlinkedClient {
    async fn upsert_page(&self, _draft: &PageDraft) -> SyncResult<PageId> {
        self.unavailable()
    }

    async fn fetch_page(&self, _id: &PageId) -> SyncResult<RemotePage> {
        self.unavailable()
    }

    async fn find_page(&self, _title: &str) -> SyncResult<Option<PageId>> {
        self.unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unlinked_client_reports_remote_failure() {
        let client = UnlinkedClient;
        let draft = PageDraft {
            page_id: None,
            parent: None,
            title: "t".into(),
            body: String::new(),
        };
        assert!(matches!(
            client.upsert_page(&draft).await,
            Err(SyncError::Remote(_))
        ));
        assert!(matches!(
            client.find_page("t").await,
            Err(SyncError::Remote(_))
        ));
    }
}
