use colored::Colorize;
use nsync_index::{FileStatus, WorkdirStatus};
use nsync_sync::{ProgressEvent, ProgressStream};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Text rendering of the `status` groups, one line per document.
pub fn status_lines(status: &WorkdirStatus) -> Vec<String> {
    if status.is_clean() {
        return vec!["Nothing to sync. Working tree clean.".into()];
    }

    let mut lines = Vec::new();
    if !status.staged.is_empty() {
        lines.push("Staged for push:".bold().to_string());
        for path in &status.staged {
            lines.push(format!("  {}   {}", "staged:".green(), path));
        }
    }
    if !status.modified.is_empty() {
        lines.push("Modified:".bold().to_string());
        for path in &status.modified {
            lines.push(format!("  {} {}", "modified:".yellow(), path));
        }
    }
    if !status.untracked.is_empty() {
        lines.push("Untracked:".bold().to_string());
        for entry in &status.untracked {
            let note = match entry.status {
                FileStatus::New {
                    previously_synced: true,
                } => " (linked to a page)".dimmed().to_string(),
                _ => String::new(),
            };
            lines.push(format!("  {}      {}{}", "new:".cyan(), entry.path, note));
        }
    }
    if !status.deleted.is_empty() {
        lines.push("Deleted:".bold().to_string());
        for path in &status.deleted {
            lines.push(format!("  {}  {}", "deleted:".red(), path));
        }
    }
    lines
}

pub fn print_status(status: &WorkdirStatus) {
    for line in status_lines(status) {
        println!("{line}");
    }
}

/// One line for a progress event, or `None` for events only worth a log
/// record. Failures go to stderr.
pub fn event_line(event: &ProgressEvent) -> Option<(bool, String)> {
    match event {
        ProgressEvent::Activity { .. } | ProgressEvent::Started { .. } => None,
        ProgressEvent::Queued { path } => {
            Some((false, format!("  {} {}", "queued:".dimmed(), path)))
        }
        ProgressEvent::Completed {
            path,
            direction,
            page_id,
        } => Some((
            false,
            format!("{} {direction} {path} ({})", "✓".green().bold(), page_id.to_string().dimmed()),
        )),
        ProgressEvent::Failed { path, error, .. } => {
            Some((true, format!("{} {path}: {error}", "✗".red().bold())))
        }
    }
}

/// Print events until the bus closes.
pub async fn print_progress(mut events: ProgressStream) {
    loop {
        match events.recv().await {
            Ok(event) => match event_line(&event) {
                Some((true, line)) => eprintln!("{line}"),
                Some((false, line)) => println!("{line}"),
                None => {}
            },
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "progress output fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}

/// Show the first few characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "*".repeat(secret.chars().count().max(4))
    } else {
        format!("{visible}…")
    }
}
