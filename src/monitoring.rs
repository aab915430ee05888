//! Run health and failure alerts

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use colored::Colorize;
use tracing::{debug, error};

/// Default window within which a log file must have been written
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(48 * 60 * 60);

/// Whether the pipelines have run recently, judged by log activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy { newest: PathBuf, age: Duration },
    Stale { newest: PathBuf, age: Duration },
    /// No log files at all
    Missing,
}

impl Health {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }
}

/// Check that the newest file in `log_dir` was modified within `max_age`
pub fn healthcheck(log_dir: &Path, max_age: Duration) -> Health {
    debug!(log_dir = %log_dir.display(), ?max_age, "healthcheck: called");
    let Ok(entries) = fs::read_dir(log_dir) else {
        return Health::Missing;
    };

    let newest = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let meta = e.metadata().ok()?;
            meta.is_file().then_some((meta.modified().ok()?, e.path()))
        })
        .max_by_key(|(modified, _)| *modified);

    let Some((modified, newest)) = newest else {
        return Health::Missing;
    };

    // A clock behind the file's mtime counts as fresh
    let age = SystemTime::now().duration_since(modified).unwrap_or_default();
    if age <= max_age {
        Health::Healthy { newest, age }
    } else {
        Health::Stale { newest, age }
    }
}

/// Report a failed task to the log and to stderr
pub fn alert_on_failure(task_id: &str, message: &str) {
    error!(task_id, message, "ALERT");
    eprintln!("{} [{}]: {}", "ALERT".red().bold(), task_id, message);
}
