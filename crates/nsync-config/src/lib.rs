//! Configuration for notion-sync.
//!
//! Settings come from `notion-sync.toml` (or the file named by `--config`),
//! then `NOTION_SYNC_*` environment variables override individual keys.
//! Every field has a default, so a missing file is not an error.

pub mod config;
pub mod error;

pub use config::{
    Config, DirectoriesConfig, LoggingConfig, NotionConfig, StatusConfig, SyncConfig,
    CONFIG_FILE_NAME, ENV_PREFIX,
};
pub use error::{ConfigError, ConfigResult};
