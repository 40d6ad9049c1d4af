use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nsync_types::PageId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// File looked up in the current directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "notion-sync.toml";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "NOTION_SYNC_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notion: NotionConfig,
    pub directories: DirectoriesConfig,
    pub sync: SyncConfig,
    pub status: StatusConfig,
    pub logging: LoggingConfig,
    /// File the configuration was read from, if any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotionConfig {
    pub token: Option<String>,
    /// Parent page for newly pushed documents; id or page URL.
    pub parent_page_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoriesConfig {
    pub markdown_root: PathBuf,
}

impl Default for DirectoriesConfig {
    fn default() -> Self {
        Self {
            markdown_root: PathBuf::from("."),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub debounce_ms: u64,
    pub exclude_patterns: Vec<String>,
    pub recursive_watch: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2000,
            exclude_patterns: Vec::new(),
            recursive_watch: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub workers: usize,
    pub fresh_window_secs: u64,
    pub synced_window_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            fresh_window_secs: 60 * 60,
            synced_window_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive used when neither `RUST_LOG` nor
    /// `--verbose` is given.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl Config {
    /// Load from `explicit`, else `./notion-sync.toml`, else defaults, then
    /// apply environment overrides.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Path::new(CONFIG_FILE_NAME);
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    debug!("no config file, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse one TOML file. No environment overrides.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        let mut config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.source = Some(path.to_path_buf());
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Apply `NOTION_SYNC_*` overrides read through `lookup`. Empty values
    /// are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.trim().is_empty())
        };
        if let Some(token) = var("NOTION_TOKEN") {
            self.notion.token = Some(token);
        }
        if let Some(parent) = var("NOTION_PARENT_PAGE_ID") {
            self.notion.parent_page_id = Some(parent);
        }
        if let Some(root) = var("MARKDOWN_ROOT") {
            self.directories.markdown_root = PathBuf::from(root);
        }
        if let Some(level) = var("LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.sync.debounce_ms)
    }

    pub fn fresh_window(&self) -> Duration {
        Duration::from_secs(self.status.fresh_window_secs)
    }

    pub fn synced_window(&self) -> Duration {
        Duration::from_secs(self.status.synced_window_secs)
    }

    /// The configured parent page, parsed.
    pub fn parent_page(&self) -> ConfigResult<Option<PageId>> {
        match self.notion.parent_page_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Ok(Some(PageId::parse(raw)?)),
        }
    }

    /// Problems that would stop push or watch from working. Empty when the
    /// configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        match self.notion.token.as_deref().map(str::trim) {
            None | Some("") => problems.push(format!(
                "notion.token is not set (or set {ENV_PREFIX}NOTION_TOKEN)"
            )),
            Some(_) => {}
        }
        if let Err(e) = self.parent_page() {
            problems.push(format!("notion.parent_page_id: {e}"));
        }
        if !self.directories.markdown_root.is_dir() {
            problems.push(format!(
                "directories.markdown_root {} is not a directory",
                self.directories.markdown_root.display()
            ));
        }
        if self.sync.debounce_ms == 0 {
            problems.push("sync.debounce_ms must be greater than 0".into());
        }
        if self.status.workers == 0 {
            problems.push("status.workers must be at least 1".into());
        }
        let level = self.logging.level.trim().to_ascii_lowercase();
        if !level.contains('=') && !LOG_LEVELS.contains(&level.as_str()) {
            problems.push(format!(
                "logging.level {:?} is not one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }
        problems
    }

    /// Template written by `init`.
    pub fn starter() -> String {
        let defaults = Self::default();
        format!(
            r#"# notion-sync configuration

[notion]
# Integration token; can also be set with {prefix}NOTION_TOKEN.
token = ""
# Page under which new documents are created (id or page URL).
parent_page_id = ""

[directories]
markdown_root = "{root}"

[sync]
debounce_ms = {debounce}
exclude_patterns = ["*.tmp", "**/drafts/**"]
recursive_watch = {recursive}

[status]
workers = {workers}
fresh_window_secs = {fresh}
synced_window_secs = {synced}

[logging]
level = "{level}"
"#,
            prefix = ENV_PREFIX,
            root = defaults.directories.markdown_root.display(),
            debounce = defaults.sync.debounce_ms,
            recursive = defaults.sync.recursive_watch,
            workers = defaults.status.workers,
            fresh = defaults.status.fresh_window_secs,
            synced = defaults.status.synced_window_secs,
            level = defaults.logging.level,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.debounce(), Duration::from_secs(2));
        assert_eq!(c.status.workers, 5);
        assert_eq!(c.fresh_window(), Duration::from_secs(3600));
        assert_eq!(c.synced_window(), Duration::from_secs(86400));
        assert_eq!(c.logging.level, "warn");
        assert!(!c.sync.recursive_watch);
        assert!(c.notion.token.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[sync]\ndebounce_ms = 500\nexclude_patterns = [\"*.tmp\"]\n").unwrap();

        let c = Config::from_file(&path).unwrap();
        assert_eq!(c.sync.debounce_ms, 500);
        assert_eq!(c.sync.exclude_patterns, vec!["*.tmp"]);
        assert_eq!(c.status, StatusConfig::default());
        assert_eq!(c.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn starter_template_parses() {
        let c: Config = toml::from_str(&Config::starter()).unwrap();
        assert_eq!(c.sync.debounce_ms, 2000);
        assert_eq!(c.status.workers, 5);
        assert_eq!(c.sync.exclude_patterns.len(), 2);
        assert_eq!(c.notion.token.as_deref(), Some(""));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[sync\ndebounce_ms = ").unwrap();
        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("NOTION_SYNC_NOTION_TOKEN", "secret_abc"),
            ("NOTION_SYNC_MARKDOWN_ROOT", "/srv/docs"),
            ("NOTION_SYNC_LOG_LEVEL", "debug"),
            ("NOTION_SYNC_NOTION_PARENT_PAGE_ID", "  "),
        ]
        .into_iter()
        .collect();

        let mut c = Config::default();
        c.notion.parent_page_id = Some("kept".into());
        c.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(c.notion.token.as_deref(), Some("secret_abc"));
        assert_eq!(c.directories.markdown_root, PathBuf::from("/srv/docs"));
        assert_eq!(c.logging.level, "debug");
        assert_eq!(c.notion.parent_page_id.as_deref(), Some("kept"));
    }

    #[test]
    fn validate_reports_each_problem() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Config::default();
        c.directories.markdown_root = dir.path().to_path_buf();
        c.notion.parent_page_id = Some("not-an-id".into());
        c.sync.debounce_ms = 0;
        c.status.workers = 0;
        c.logging.level = "loud".into();

        let problems = c.validate();
        assert_eq!(problems.len(), 5, "{problems:?}");
        assert!(problems[0].contains("notion.token"));
    }

    #[test]
    fn valid_config_has_no_problems() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = Config::default();
        c.notion.token = Some("secret_abc".into());
        c.notion.parent_page_id =
            Some("https://www.notion.so/Team-Notes-0123456789abcdef0123456789abcdef".into());
        c.directories.markdown_root = dir.path().to_path_buf();
        c.logging.level = "nsync_index=debug,warn".into();

        assert!(c.validate().is_empty());
        assert!(c.parent_page().unwrap().is_some());
    }
}
