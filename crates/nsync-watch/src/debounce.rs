//! Per-path debouncing.
//!
//! Each path has at most one pending timer. A new event for the path aborts
//! the pending timer and arms a fresh one, so the handler runs once per burst,
//! `delay` after the last event. Paths are independent: every timer runs on
//! its own task, and a slow handler never delays another path.
//!
//! Entry states: idle (absent), pending (timer armed), firing (handler
//! running). An event during firing arms a new timer; the entry is removed
//! when the handler returns only if no newer event arrived meanwhile.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Work run for a path once its events go quiet.
#[async_trait]
pub trait PathHandler: Send + Sync + 'static {
    /// Handle `path`. `token` is the watcher's token; it may already be
    /// cancelled when this runs.
    async fn handle(&self, token: CancellationToken, path: PathBuf);
}

struct Pending {
    generation: u64,
    /// `None` once the handler is running.
    timer: Option<AbortHandle>,
}

struct Inner<H> {
    delay: Duration,
    handler: H,
    token: CancellationToken,
    pending: Mutex<HashMap<PathBuf, Pending>>,
    generation: AtomicU64,
}

/// Collapses bursts of events per path into one handler call.
pub struct Debouncer<H> {
    inner: Arc<Inner<H>>,
}

impl<H> Clone for Debouncer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: PathHandler> Debouncer<H> {
    pub fn new(delay: Duration, handler: H, token: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                delay,
                handler,
                token,
                pending: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }

    pub fn handler(&self) -> &H {
        &self.inner.handler
    }

    /// Record an event for `path`, restarting its quiet period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, path: PathBuf) {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let mut pending = self.inner.pending.lock().expect("debounce map poisoned");

        if let Some(prev) = pending.get(&path) {
            if let Some(timer) = &prev.timer {
                timer.abort();
                trace!(path = %path.display(), "debounce timer reset");
            }
        }

        let inner = Arc::clone(&self.inner);
        let task_path = path.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(inner.delay).await;
            inner.fire(task_path, generation).await;
        });

        pending.insert(
            path,
            Pending {
                generation,
                timer: Some(task.abort_handle()),
            },
        );
    }

    /// Number of paths with an armed or running timer.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().expect("debounce map poisoned").len()
    }

    pub fn is_pending(&self, path: &Path) -> bool {
        self.inner
            .pending
            .lock()
            .expect("debounce map poisoned")
            .contains_key(path)
    }
}

impl<H: PathHandler> Inner<H> {
    async fn fire(&self, path: PathBuf, generation: u64) {
        {
            let mut pending = self.pending.lock().expect("debounce map poisoned");
            match pending.get_mut(&path) {
                Some(entry) if entry.generation == generation => entry.timer = None,
                // Superseded between wake-up and lock.
                _ => return,
            }
        }

        trace!(path = %path.display(), "debounce timer fired");
        self.handler.handle(self.token.clone(), path.clone()).await;

        let mut pending = self.pending.lock().expect("debounce map poisoned");
        if pending
            .get(&path)
            .is_some_and(|entry| entry.generation == generation)
        {
            pending.remove(&path);
        }
    }
}
