use std::path::PathBuf;
use std::time::Duration;

/// Default quiet period before a changed document is pushed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Configuration for [`FsWatcher`](crate::FsWatcher).
#[derive(Clone, Debug)]
pub struct WatchConfig {
    /// Directory to watch.
    pub root: PathBuf,
    /// Quiet period per path before the handler runs.
    pub debounce: Duration,
    /// Glob patterns; matching paths are ignored.
    pub exclude_patterns: Vec<String>,
    /// Watch subdirectories too. Off by default.
    pub recursive: bool,
    /// Capacity of the channel between notify and the event loop.
    pub channel_capacity: usize,
}

impl WatchConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
            exclude_patterns: Vec::new(),
            recursive: false,
            channel_capacity: 256,
        }
    }
}
