// Log setup
//
// VIZDASH_LOG takes a full EnvFilter directive and wins over -v. The
// dashboard logs to a file because stderr belongs to the terminal UI.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "VIZDASH_LOG";

/// Where log lines go.
pub enum LogTarget {
    Stderr,
    /// Append to this file
    File(PathBuf),
}

/// Filter for `-v` repetitions: warn, info, debug, trace.
fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn env_filter(verbosity: u8) -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity))),
        _ => EnvFilter::new(default_filter(verbosity)),
    }
}

/// Default dashboard log file (~/.cache/vizdash/dashboard.log)
pub fn dashboard_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vizdash")
        .join("dashboard.log")
}

/// Install the global subscriber. Safe to call once; later calls are
/// ignored.
pub fn init(verbosity: u8, target: LogTarget) {
    let filter = env_filter(verbosity);

    // A subscriber may already be installed (tests); keep it
    let _ = match target {
        LogTarget::Stderr => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init(),
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            match OpenOptions::new().create(true).append(true).open(&path) {
                Ok(file) => tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .try_init(),
                // No log file: stay silent rather than draw over the UI
                Err(_) => Ok(()),
            }
        }
    };
}
