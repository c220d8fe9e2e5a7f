//! Structured JSONL logging plus human-readable stderr output.
//!
//! - **JSONL to file** (~/.clipboard_manager/logs/clipboard-manager.jsonl)
//! - **Compact to stderr**
//!
//! Log lengths and counts, never clipboard contents.
//!
//! ```rust,ignore
//! // Keep the guard alive for the duration of the program
//! let _guard = clipboard_manager::logging::init();
//! tracing::info!(entries = 3, "History loaded");
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "clipboard-manager.jsonl";
const DEFAULT_FILTER: &str = "info";

/// Dropping this guard flushes and closes the log file.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize file and stderr logging. `RUST_LOG` overrides the default
/// `info` filter.
pub fn init() -> LoggingGuard {
    let log_path = log_path();
    let file = open_log_file(&log_path);

    // Non-blocking so disk latency never stalls the monitor thread
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json_layer = fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_level(true)
        .with_thread_names(true)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!(log_path = %log_path.display(), "Logging initialized");

    LoggingGuard {
        _file_guard: file_guard,
    }
}

/// Open `path` for appending, creating its directory. Falls back to a sink
/// so logging setup never aborts the program.
fn open_log_file(path: &Path) -> Box<dyn Write + Send> {
    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir) {
            eprintln!("[LOGGING] Failed to create log directory: {}", e);
        }
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Box::new(file),
        Err(e) => {
            eprintln!("[LOGGING] Failed to open log file: {}", e);
            Box::new(std::io::sink())
        }
    }
}

fn log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".clipboard_manager").join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("clipboard-manager-logs"))
}

/// Path to the JSONL log file
pub fn log_path() -> PathBuf {
    log_dir().join(LOG_FILE_NAME)
}
