use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use nsync_types::SyncDirection;

#[derive(Parser)]
#[command(
    name = "notion-sync",
    about = "Keep a directory of markdown documents in step with a remote workspace",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ./notion-sync.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a starter config, a sample document, and the index
    Init(InitArgs),
    /// Stage documents for the next push
    Add(AddArgs),
    /// Unstage documents
    Reset(ResetArgs),
    /// Show staged, modified, untracked and deleted documents
    Status(StatusArgs),
    /// Push staged documents, or one document
    Push(PushArgs),
    /// Pull pages into documents
    Pull(PullArgs),
    /// Push, pull, or reconcile both ways
    Sync(SyncArgs),
    /// Push documents as they change, until interrupted
    Watch(WatchArgs),
    /// Check the configuration
    Verify(VerifyArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct AddArgs {
    /// Files, directories, glob patterns, or `.` for every change
    #[arg(required = true)]
    pub paths: Vec<String>,
}

#[derive(Args)]
pub struct ResetArgs {
    pub paths: Vec<String>,
    /// Unstage everything
    #[arg(long, conflicts_with = "paths")]
    pub all: bool,
}

#[derive(Args)]
pub struct StatusArgs {}

#[derive(Args)]
pub struct PushArgs {
    /// Push only this document
    pub path: Option<PathBuf>,
    /// Show what would be pushed
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct PullArgs {
    /// Page id or page URL
    #[arg(long, conflicts_with = "page")]
    pub page_id: Option<String>,
    /// Page title
    #[arg(long)]
    pub page: Option<String>,
    /// Target document for a single page
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct SyncArgs {
    /// push, pull, or bidirectional
    pub direction: SyncDirection,
    #[arg(long, conflicts_with = "directory")]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub directory: Option<PathBuf>,
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Debounce interval, e.g. `500ms` or `2s`
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
}

#[derive(Args)]
pub struct VerifyArgs {}
