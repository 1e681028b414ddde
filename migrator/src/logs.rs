//! Logging setup and progress reporting.
//!
//! Logs go to stderr and to `<log_dir>/<tool>_<YYYYmmdd_HHMMSS>.log`.
//! The level is `info` (`debug` when verbose); `RUST_LOG` wins over both.

use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Build the log file path for a tool started at `started`.
pub fn log_file_path(log_dir: &Path, tool: &str, started: DateTime<Local>) -> PathBuf {
    log_dir.join(format!("{}_{}.log", tool, started.format("%Y%m%d_%H%M%S")))
}

/// Install the global subscriber.
///
/// Returns the log file path, or `None` when only console logging could be
/// set up. Calling this twice is harmless: the second call keeps the first
/// subscriber.
pub fn init_logging(tool: &str, log_dir: &Path, verbose: bool) -> Option<PathBuf> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let path = log_file_path(log_dir, tool, Local::now());
    let file = fs::create_dir_all(log_dir)
        .and_then(|_| File::create(&path))
        .map_err(|e| (log_dir.to_path_buf(), e));

    let (file_layer, file_error) = match file {
        Ok(file) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Err(err) => (None, Some(err)),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .is_ok();

    match file_error {
        Some((dir, err)) => {
            warn!("Cannot create log directory {}: {}. Logging to console only", dir.display(), err);
            None
        }
        None if installed => {
            info!("Logging to {}", path.display());
            Some(path)
        }
        None => None,
    }
}

// =============================================================================
// Progress
// =============================================================================

/// Logs `processed/total (pct%)` at every 10% of a loop.
#[derive(Debug, Clone)]
pub struct Progress {
    label: String,
    total: usize,
    step: usize,
    enabled: bool,
}

impl Progress {
    pub fn new(label: impl Into<String>, total: usize, enabled: bool) -> Self {
        Self {
            label: label.into(),
            total,
            step: (total / 10).max(1),
            enabled,
        }
    }

    /// Report that `processed` rows are done. Returns true when a line was logged.
    pub fn tick(&self, processed: usize) -> bool {
        if !self.enabled || self.total == 0 {
            return false;
        }
        if processed % self.step != 0 && processed != self.total {
            return false;
        }
        let pct = processed as f64 / self.total as f64 * 100.0;
        info!("{}: {}/{} ({:.0}%)", self.label, processed, self.total, pct);
        true
    }
}
