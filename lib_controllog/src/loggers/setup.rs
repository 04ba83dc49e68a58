//! # Logging Setup
//!
//! Installs a `tracing` subscriber writing to stdout and to a timestamped file
//! in the log directory. Only the newest log file from earlier runs is kept.

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use crate::error::{ControlLogError, Result};

/// Sets up logging for `app_name`.
///
/// `RUST_LOG` takes precedence over `log_level`. The returned guard flushes the
/// file writer when dropped and must live as long as the process.
pub fn setup_logging(app_name: &str, log_dir: &Path, log_level: &str) -> Result<WorkerGuard> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir).map_err(config_err)?;
    }

    cleanup_old_logs(log_dir).map_err(config_err)?;

    let log_file_name = format!(
        "{}_{}.log",
        app_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let file_appender = tracing_appender::rolling::never(log_dir, log_file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| ControlLogError::Config(format!("Invalid log level '{log_level}': {e}")))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(io::stdout.and(file_writer))
        .try_init()
        .map_err(|e| ControlLogError::Config(format!("Failed to install subscriber: {e}")))?;

    Ok(guard)
}

/// Deletes every `.log` file in `log_dir` except the most recently modified one.
pub fn cleanup_old_logs(log_dir: &Path) -> io::Result<usize> {
    let mut entries: Vec<(std::time::SystemTime, std::path::PathBuf)> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
            Some((modified, path))
        })
        .collect();

    // Newest first.
    entries.sort_by(|a, b| b.0.cmp(&a.0));

    let mut removed = 0;
    for (_, path) in entries.iter().skip(1) {
        match fs::remove_file(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Failed to delete old log file {}: {}", path.display(), e),
        }
    }
    Ok(removed)
}

fn config_err(e: io::Error) -> ControlLogError {
    ControlLogError::Config(format!("Log directory: {e}"))
}
