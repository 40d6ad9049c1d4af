use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use nsync_config::{Config, CONFIG_FILE_NAME};
use nsync_index::{collect_documents, entry::to_datetime, ResetOutcome, StatusMap, WorkdirStatus};
use nsync_sync::{
    newest_wins, plan_push, PageRef, ProgressBus, PullRequest, PushScope, RemoteClient,
    Resolution, Side, SyncDriver, SyncError,
};
use nsync_types::{PageId, SyncDirection};
use nsync_watch::{FsWatcher, PushHandler, WatchConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::*;
use crate::output;
use crate::workspace::{LinkedDocument, Workspace};

const SAMPLE_DOCUMENT: &str = "welcome.md";

pub async fn run_command(cli: Cli, config: Config) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(args, config, cli.config.as_deref()),
        Command::Verify(_) => cmd_verify(&config),
        Command::Add(args) => cmd_add(args, &Workspace::open(config)?),
        Command::Reset(args) => cmd_reset(args, &Workspace::open(config)?),
        Command::Status(_) => cmd_status(format, &Workspace::open(config)?),
        Command::Push(args) => cmd_push(args, &Workspace::open(config)?, &shutdown_token()).await,
        Command::Pull(args) => cmd_pull(args, &Workspace::open(config)?, &shutdown_token()).await,
        Command::Sync(args) => cmd_sync(args, &Workspace::open(config)?, &shutdown_token()).await,
        Command::Watch(args) => cmd_watch(args, &Workspace::open(config)?, shutdown_token()).await,
    }
}

/// A token cancelled on ctrl-c, or SIGTERM on unix.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown requested");
        trigger.cancel();
    });
    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "cannot listen for SIGTERM");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn cmd_init(args: InitArgs, config: Config, explicit: Option<&Path>) -> anyhow::Result<()> {
    let config_path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if config_path.exists() && !args.force {
        println!("  {}  {}", "kept:".dimmed(), config_path.display());
    } else {
        fs::write(&config_path, Config::starter())
            .with_context(|| format!("cannot write {}", config_path.display()))?;
        println!("  {} {}", "wrote:".green(), config_path.display());
    }

    let root = &config.directories.markdown_root;
    fs::create_dir_all(root).with_context(|| format!("cannot create {}", root.display()))?;
    let ws = Workspace::open(config)?;

    if collect_documents(ws.root())?.is_empty() {
        let sample = ws.root().join(SAMPLE_DOCUMENT);
        fs::write(&sample, sample_document())
            .with_context(|| format!("cannot write {}", sample.display()))?;
        println!("  {} {}", "wrote:".green(), sample.display());
    }

    ws.staging().initialize()?;
    println!(
        "{} Initialized notion-sync in {}",
        "✓".green().bold(),
        ws.root().display().to_string().bold()
    );
    Ok(())
}

fn sample_document() -> String {
    format!(
        "---\ntitle: Welcome\n---\n# Welcome\n\n\
         This document was created by `notion-sync init`.\n\n\
         - `notion-sync add {SAMPLE_DOCUMENT}` stages it\n\
         - `notion-sync push` uploads staged documents\n\
         - `notion-sync watch` pushes documents as you save them\n"
    )
}

fn cmd_add(args: AddArgs, ws: &Workspace) -> anyhow::Result<()> {
    ws.require_initialized()?;
    let mut paths = BTreeSet::new();
    for arg in &args.paths {
        let expanded = ws.expand(arg)?;
        if expanded.is_empty() {
            eprintln!("{} {arg} matched no documents", "Warning:".yellow().bold());
        }
        paths.extend(expanded);
    }
    if paths.is_empty() {
        eprintln!("{} nothing to add", "Warning:".yellow().bold());
        return Ok(());
    }

    let added = ws.staging().add_files(&paths)?;
    for entry in &added {
        println!("  {} {}", "staged:".green(), entry.path);
    }
    println!("{} Staged {} document(s)", "✓".green().bold(), added.len());
    Ok(())
}

fn cmd_reset(args: ResetArgs, ws: &Workspace) -> anyhow::Result<()> {
    ws.require_initialized()?;
    if args.all || args.paths.is_empty() {
        let cleared = ws.staging().reset_all()?;
        if cleared.is_empty() {
            println!("Nothing staged.");
            return Ok(());
        }
        for path in &cleared {
            println!("  {} {}", "unstaged:".yellow(), path);
        }
        println!("{} Unstaged {} document(s)", "✓".green().bold(), cleared.len());
        return Ok(());
    }

    let mut unstaged = 0;
    for arg in &args.paths {
        let rel = ws.rel_path(Path::new(arg))?;
        match ws.staging().reset_file(rel.as_str())? {
            ResetOutcome::Unstaged => {
                unstaged += 1;
                println!("  {} {}", "unstaged:".yellow(), rel);
            }
            outcome => eprintln!("{} {rel} is {outcome}", "Warning:".yellow().bold()),
        }
    }
    println!("{} Unstaged {unstaged} document(s)", "✓".green().bold());
    Ok(())
}

fn cmd_status(format: OutputFormat, ws: &Workspace) -> anyhow::Result<()> {
    ws.require_initialized()?;
    let statuses = ws.staging().status()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&statuses)?),
        OutputFormat::Text => output::print_status(&WorkdirStatus::from_map(&statuses)),
    }
    Ok(())
}

async fn cmd_push(args: PushArgs, ws: &Workspace, token: &CancellationToken) -> anyhow::Result<()> {
    ws.require_initialized()?;
    let targets: Vec<String> = match &args.path {
        Some(path) => vec![ws.rel_path(path)?.into_string()],
        None => ws.staging().staged_files()?.into_iter().collect(),
    };

    if args.dry_run {
        let statuses = ws.staging().status()?;
        if args.path.is_some() {
            print_dry_run(&statuses, &targets);
        } else {
            let planned: Vec<String> = plan_push(&statuses, PushScope::Staged)
                .into_iter()
                .map(|c| c.path)
                .collect();
            print_dry_run(&statuses, &planned);
        }
        return Ok(());
    }

    if targets.is_empty() {
        println!("Nothing to push. Stage documents with `notion-sync add`.");
        return Ok(());
    }

    let driver = ws.driver(ProgressBus::default())?;
    let report = push_all(ws, &driver, token, &targets).await?;
    report.finish("Pushed")
}

fn print_dry_run(statuses: &StatusMap, paths: &[String]) {
    for path in paths {
        let label = statuses.get(path).map_or("unmodified", |s| s.label());
        println!("  {} {} ({label})", "would push:".cyan(), path);
    }
    println!("{} document(s) would be pushed", paths.len());
}

/// Per-run tally of document transfers.
#[derive(Default)]
struct Report {
    done: Vec<String>,
    failed: usize,
    interrupted: bool,
}

impl Report {
    fn finish(self, verb: &str) -> anyhow::Result<()> {
        println!("{} {verb} {} document(s)", "✓".green().bold(), self.done.len());
        if self.interrupted {
            bail!("interrupted");
        }
        if self.failed > 0 {
            bail!("{} document(s) failed", self.failed);
        }
        Ok(())
    }

    fn record_error(&mut self, label: &str, err: &SyncError) {
        if err.is_cancelled() {
            self.interrupted = true;
        } else {
            self.failed += 1;
            eprintln!("{} {label}: {err}", "✗".red().bold());
        }
    }
}

/// Push `paths` one by one and record the successes in the index.
async fn push_all(
    ws: &Workspace,
    driver: &dyn SyncDriver,
    token: &CancellationToken,
    paths: &[String],
) -> anyhow::Result<Report> {
    let mut report = Report::default();
    for path in paths {
        if token.is_cancelled() {
            report.interrupted = true;
            break;
        }
        let absolute = ws.root().join(path);
        match driver.push(token, &absolute).await {
            Ok(outcome) => {
                let verb = if outcome.created { "created:" } else { "pushed:" };
                println!("  {} {} ({})", verb.green(), outcome.path, outcome.page_id);
                report.done.push(outcome.path);
            }
            Err(err) => report.record_error(path, &err),
        }
    }
    if !report.done.is_empty() {
        ws.staging().mark_synced(&report.done)?;
    }
    Ok(report)
}

/// Pull each request and record the pulled documents in the index.
async fn pull_all(
    ws: &Workspace,
    driver: &dyn SyncDriver,
    token: &CancellationToken,
    requests: &[PullRequest],
) -> anyhow::Result<Report> {
    let mut report = Report::default();
    for request in requests {
        if token.is_cancelled() {
            report.interrupted = true;
            break;
        }
        match driver.pull(token, request).await {
            Ok(pulled) => {
                println!("  {} {} ({})", "pulled:".green(), pulled.path, pulled.title);
                report.done.push(pulled.path);
            }
            Err(err) => {
                let label = match &request.page {
                    PageRef::Id(id) => id.to_string(),
                    PageRef::Title(title) => title.clone(),
                };
                report.record_error(&label, &err);
            }
        }
    }
    if !report.done.is_empty() {
        ws.staging().mark_synced(&report.done)?;
    }
    Ok(report)
}

fn refresh_request(doc: &LinkedDocument, ws: &Workspace) -> PullRequest {
    PullRequest {
        page: PageRef::Id(doc.page_id),
        output: Some(doc.path.to_path(ws.root())),
    }
}

async fn cmd_pull(args: PullArgs, ws: &Workspace, token: &CancellationToken) -> anyhow::Result<()> {
    ws.require_initialized()?;
    let output = match &args.output {
        Some(path) => Some(ws.rel_path(path)?.to_path(ws.root())),
        None => None,
    };

    let requests = if let Some(raw) = &args.page_id {
        vec![PullRequest {
            page: PageRef::Id(PageId::parse(raw)?),
            output,
        }]
    } else if let Some(title) = &args.page {
        vec![PullRequest {
            page: PageRef::Title(title.clone()),
            output,
        }]
    } else {
        if output.is_some() {
            bail!("--output needs --page-id or --page");
        }
        ws.linked_documents()?
            .iter()
            .map(|doc| refresh_request(doc, ws))
            .collect()
    };

    if requests.is_empty() {
        println!("No tracked document is linked to a page.");
        return Ok(());
    }
    let driver = ws.driver(ProgressBus::default())?;
    pull_all(ws, &driver, token, &requests).await?.finish("Pulled")
}

async fn cmd_sync(args: SyncArgs, ws: &Workspace, token: &CancellationToken) -> anyhow::Result<()> {
    ws.require_initialized()?;
    let scope = ws.scope(args.file.as_deref(), args.directory.as_deref())?;
    let in_scope = |path: &str| scope.as_ref().map_or(true, |s| s.contains(path));
    info!(direction = %args.direction, dry_run = args.dry_run, "sync");

    let driver = ws.driver(ProgressBus::default())?;
    let (pushes, pulls) = match args.direction {
        SyncDirection::Push => (push_targets(ws, scope.as_ref())?, Vec::new()),
        SyncDirection::Pull => {
            let linked: Vec<_> = ws
                .linked_documents()?
                .into_iter()
                .filter(|doc| in_scope(doc.path.as_str()))
                .collect();
            (Vec::new(), linked)
        }
        SyncDirection::Bidirectional => {
            reconcile(ws, &driver, token, scope.as_ref(), args.dry_run).await?
        }
    };

    if args.dry_run {
        for path in &pushes {
            println!("  {} {}", "would push:".cyan(), path);
        }
        for doc in &pulls {
            println!("  {} {}", "would pull:".cyan(), doc.path);
        }
        println!(
            "{} to push, {} to pull",
            pushes.len(),
            pulls.len()
        );
        return Ok(());
    }

    let pushed = push_all(ws, &driver, token, &pushes).await?;
    let requests: Vec<_> = pulls.iter().map(|doc| refresh_request(doc, ws)).collect();
    let pulled = pull_all(ws, &driver, token, &requests).await?;

    let failed = pushed.failed + pulled.failed;
    println!(
        "{} Synced: {} pushed, {} pulled",
        "✓".green().bold(),
        pushed.done.len(),
        pulled.done.len()
    );
    if pushed.interrupted || pulled.interrupted {
        bail!("interrupted");
    }
    if failed > 0 {
        bail!("{failed} document(s) failed");
    }
    Ok(())
}

/// Documents a push-direction sync uploads: everything in scope, or every
/// staged, modified and new document when no scope is given.
fn push_targets(ws: &Workspace, scope: Option<&BTreeSet<String>>) -> anyhow::Result<Vec<String>> {
    match scope {
        Some(paths) => Ok(paths.iter().cloned().collect()),
        None => Ok(plan_push(&ws.staging().status()?, PushScope::Changed)
            .into_iter()
            .map(|c| c.path)
            .collect()),
    }
}

/// Split linked documents into pushes and pulls by modification time.
/// Changed documents without a page are pushed.
async fn reconcile<C: RemoteClient>(
    ws: &Workspace,
    driver: &nsync_sync::DocumentDriver<C>,
    token: &CancellationToken,
    scope: Option<&BTreeSet<String>>,
    dry_run: bool,
) -> anyhow::Result<(Vec<String>, Vec<LinkedDocument>)> {
    let in_scope = |path: &str| scope.map_or(true, |s| s.contains(path));
    let index = ws.staging().entries()?;
    let mut pushes = Vec::new();
    let mut pulls = Vec::new();
    let mut failed = 0;

    let linked: Vec<_> = ws
        .linked_documents()?
        .into_iter()
        .filter(|doc| in_scope(doc.path.as_str()))
        .collect();
    let linked_paths: BTreeSet<String> = linked.iter().map(|d| d.path.to_string()).collect();

    for doc in linked {
        if token.is_cancelled() {
            bail!("interrupted");
        }
        let remote = match driver.client().fetch_page(&doc.page_id).await {
            Ok(page) => page,
            Err(err) => {
                failed += 1;
                eprintln!("{} {}: {err}", "✗".red().bold(), doc.path);
                continue;
            }
        };
        let modified = fs::metadata(doc.path.to_path(ws.root()))
            .and_then(|m| m.modified())
            .with_context(|| format!("cannot stat {}", doc.path))?;
        let last_synced = index.get(doc.path.as_str()).and_then(|e| e.last_synced);

        let resolution = newest_wins(to_datetime(modified), remote.last_edited, last_synced);
        debug!(path = %doc.path, ?resolution, "reconciled");
        match resolution {
            Resolution::UpToDate => {}
            Resolution::Push => pushes.push(doc.path.to_string()),
            Resolution::Pull => pulls.push(doc),
            Resolution::Conflict { winner } => {
                let kept = match winner {
                    Side::Local => "local",
                    Side::Remote => "remote",
                };
                eprintln!(
                    "{} {} changed on both sides; keeping the {kept} copy",
                    "Warning:".yellow().bold(),
                    doc.path
                );
                match winner {
                    Side::Local => pushes.push(doc.path.to_string()),
                    Side::Remote => pulls.push(doc),
                }
            }
        }
    }

    for path in push_targets(ws, scope)? {
        if !linked_paths.contains(&path) && !pushes.contains(&path) {
            pushes.push(path);
        }
    }

    if failed > 0 && !dry_run {
        bail!("{failed} remote page(s) could not be fetched");
    }
    Ok((pushes, pulls))
}

async fn cmd_watch(args: WatchArgs, ws: &Workspace, token: CancellationToken) -> anyhow::Result<()> {
    ws.require_initialized()?;
    let settings = ws.config();

    let mut config = WatchConfig::new(ws.root());
    config.debounce = args.interval.unwrap_or_else(|| settings.debounce());
    config.exclude_patterns = settings.sync.exclude_patterns.clone();
    config.recursive = settings.sync.recursive_watch;
    let debounce = config.debounce;

    let progress = ProgressBus::default();
    let printer = tokio::spawn(output::print_progress(progress.subscribe()));

    let driver: Arc<dyn SyncDriver> = Arc::new(ws.driver(progress.clone())?);
    let handler = PushHandler::new(driver, ws.staging_arc());
    let watcher = FsWatcher::new(config, handler, progress, token)?;

    println!(
        "Watching {} (debounce {}). Press Ctrl-C to stop.",
        ws.root().display().to_string().bold(),
        humantime::format_duration(debounce)
    );
    watcher.run().await?;
    printer.abort();
    println!("{} Stopped watching", "✓".green().bold());
    Ok(())
}

fn cmd_verify(config: &Config) -> anyhow::Result<()> {
    let source = config
        .source
        .as_ref()
        .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string());
    println!("Configuration: {}", source.bold());

    let token = match config.notion.token.as_deref().map(str::trim) {
        None | Some("") => "(not set)".dimmed().to_string(),
        Some(token) => output::mask_secret(token),
    };
    let parent = config
        .notion
        .parent_page_id
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or("(none)");
    println!("  token:           {token}");
    println!("  parent page:     {parent}");
    println!("  markdown root:   {}", config.directories.markdown_root.display());
    println!("  debounce:        {}", humantime::format_duration(config.debounce()));
    println!("  exclude:         {:?}", config.sync.exclude_patterns);
    println!("  recursive watch: {}", config.sync.recursive_watch);
    println!("  status workers:  {}", config.status.workers);
    println!("  log level:       {}", config.logging.level);

    let problems = config.validate();
    if problems.is_empty() {
        println!("{} Configuration is valid", "✓".green().bold());
        return Ok(());
    }
    for problem in &problems {
        eprintln!("{} {problem}", "✗".red().bold());
    }
    bail!("{} configuration problem(s)", problems.len())
}
