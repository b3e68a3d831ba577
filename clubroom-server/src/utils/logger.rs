//! Logging Infrastructure
//!
//! Structured logging setup for both development and production environments.
//! `RUST_LOG` takes precedence over the configured level.

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize the logger
pub fn init_logger() {
    init_logger_with_file(None, false, None);
}

/// Initialize the logger with optional JSON format and daily rolling file output
///
/// Calling it twice is harmless; the second subscriber is dropped.
pub fn init_logger_with_file(log_level: Option<&str>, json: bool, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    let file_appender = log_dir
        .map(Path::new)
        .filter(|p| p.exists())
        .map(|p| tracing_appender::rolling::daily(p, "clubroom-server"));

    let result = match (json, file_appender) {
        (true, Some(writer)) => builder.json().with_writer(writer).try_init(),
        (true, None) => builder.json().try_init(),
        (false, Some(writer)) => builder.with_ansi(false).with_writer(writer).try_init(),
        (false, None) => builder.try_init(),
    };

    if let Err(e) = result {
        tracing::debug!("Logger already initialized: {}", e);
    }
}
