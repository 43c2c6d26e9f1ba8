//! Installs the global `tracing` subscriber for the binary.
//!
//! Library code only emits events through `tracing` macros inside each fetcher's span;
//! installing a subscriber is left to whoever runs the process.

use crate::error::{AppError, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// How log output should be formatted and where it should go.
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    /// Emit newline-delimited JSON instead of human-readable lines.
    pub json: bool,
    /// Write to a daily-rolling file in this directory instead of stderr.
    pub log_dir: Option<PathBuf>,
}

impl LogSettings {
    /// Reads `LOG_FORMAT=json` and `LOG_DIR` from the environment.
    pub fn from_env() -> Self {
        Self {
            json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().map(PathBuf::from),
        }
    }
}

/// Initializes logging. Filtering follows `RUST_LOG`, defaulting to `info`.
///
/// The returned guard must be held for the life of the process when logging to a file,
/// otherwise buffered lines are lost.
pub fn init(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let (writer, guard) = match &settings.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "etl-fetch.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        },
        None => (None, None),
    };

    let installed = match (settings.json, writer) {
        (true, Some(w)) => builder.json().with_writer(w).try_init(),
        (false, Some(w)) => builder.with_ansi(false).with_writer(w).try_init(),
        (true, None) => builder.json().with_writer(std::io::stderr).try_init(),
        (false, None) => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| AppError::Config(format!("cannot install logger: {}", e)))?;

    Ok(guard)
}
