//! # Logging
//!
//! Diagnostic output for Nav Logger:
//! - Console output for interactive runs
//! - `<dir>/<file>` written through a non-blocking appender, cleared on start
//! - `RUST_LOG` overrides the configured level
//!
//! Port open failures and reader task faults are emitted with the `startup`
//! target, so `RUST_LOG=startup=debug` isolates the startup trail.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Keeps the file writer alive; dropping it flushes the log file
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Create `dir` if needed and truncate the log file of a previous session
fn prepare_log_file(dir: &Path, file: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(file);
    fs::write(&path, "")?;
    Ok(path)
}

/// Filter from `RUST_LOG`, falling back to the configured level
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(config: &LoggingConfig) -> io::Result<LoggingGuard> {
    prepare_log_file(&config.dir, &config.file)?;

    let file_appender = tracing_appender::rolling::never(&config.dir, &config.file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_target(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_target(true);

    tracing_subscriber::registry()
        .with(build_filter(&config.level))
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_creates_directory_and_file() {
        let root = TempDir::new().unwrap();
        let dir = root.path().join("nested").join("logs");

        let path = prepare_log_file(&dir, "startup.log").unwrap();
        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_prepare_clears_previous_session() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("startup.log");
        fs::write(&path, "old session").unwrap();

        prepare_log_file(root.path(), "startup.log").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // Must not panic on garbage directives
        let _ = build_filter("not a [valid directive");
        let _ = build_filter("debug,startup=trace");
    }
}
