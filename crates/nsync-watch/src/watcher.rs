//! The event loop tying notify to the debouncer.

use std::path::Path;

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use nsync_sync::{ProgressBus, ProgressEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::debounce::{Debouncer, PathHandler};
use crate::error::{WatchError, WatchResult};
use crate::filter::EventFilter;

/// Watches the markdown root and pushes documents once they go quiet.
pub struct FsWatcher<H> {
    config: WatchConfig,
    filter: EventFilter,
    debouncer: Debouncer<H>,
    progress: ProgressBus,
    token: CancellationToken,
}

impl<H: PathHandler> FsWatcher<H> {
    /// Build a watcher. `token` stops event intake and is handed to every
    /// handler call.
    pub fn new(
        config: WatchConfig,
        handler: H,
        progress: ProgressBus,
        token: CancellationToken,
    ) -> WatchResult<Self> {
        let filter = EventFilter::new(&config.root, &config.exclude_patterns)?;
        let debouncer = Debouncer::new(config.debounce, handler, token.clone());
        Ok(Self {
            config,
            filter,
            debouncer,
            progress,
            token,
        })
    }

    pub fn debouncer(&self) -> &Debouncer<H> {
        &self.debouncer
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Feed one notify event through the filter into the debouncer.
    ///
    /// Returns the number of paths scheduled.
    pub fn handle_event(&self, event: &Event) -> usize {
        let paths = self.filter.accept(event);
        for path in &paths {
            let shown = display_path(&self.config.root, path);
            info!(path = %shown, kind = ?event.kind, "document changed");
            self.progress.emit(ProgressEvent::Activity {
                path: shown.clone(),
                kind: "modified".into(),
            });
            self.progress.emit(ProgressEvent::Queued { path: shown });
            self.debouncer.schedule(path.clone());
        }
        paths.len()
    }

    /// Watch until the token is cancelled.
    ///
    /// Timers armed before cancellation still fire; their handlers see the
    /// cancelled token.
    pub async fn run(&self) -> WatchResult<()> {
        if !self.config.root.is_dir() {
            return Err(WatchError::RootMissing(self.config.root.clone()));
        }

        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if tx.blocking_send(res).is_err() {
                    debug!("watch channel closed, dropping event");
                }
            },
            NotifyConfig::default(),
        )?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&self.config.root, mode)?;
        info!(
            root = %self.config.root.display(),
            recursive = self.config.recursive,
            debounce_ms = self.config.debounce.as_millis() as u64,
            "watching for changes"
        );

        loop {
            tokio::select! {
                _ = self.token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(Ok(event)) => {
                        self.handle_event(&event);
                    }
                    Some(Err(err)) => warn!(error = %err, "watch error"),
                    None => break,
                },
            }
        }

        drop(watcher);
        info!(pending = self.debouncer.pending_count(), "watcher stopped");
        Ok(())
    }
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
