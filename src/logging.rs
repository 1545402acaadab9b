//! Logging setup for the `datacert` binary.
//!
//! Logs go to the console and to two daily-rolling files: `datacert.<date>.log`
//! with every enabled level and `error.<date>.log` with warnings and errors.
//! The level defaults to `info` and can be overridden with `RUST_LOG`.
//!
//! ```no_run
//! use datacert::logging;
//!
//! logging::init(None).expect("Failed to initialize logging");
//! tracing::info!("Certification started");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Platform data directory joined with `datacert/logs`.
///
/// - Windows: `%APPDATA%/datacert/logs`
/// - macOS: `~/Library/Application Support/datacert/logs`
/// - Linux: `~/.local/share/datacert/logs`
pub fn default_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("datacert").join("logs"))
}

/// Install the global subscriber. Call once, at startup.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or a file appender fails.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let log_dir = match log_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_log_dir()?,
    };

    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

    let all_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("datacert")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create all-logs file appender")?;

    let error_logs_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(10)
        .filename_prefix("error")
        .filename_suffix("log")
        .build(&log_dir)
        .context("Failed to create error-logs file appender")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    // Console output goes to stderr so command output on stdout stays parseable.
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!("Logging initialized, log directory: {}", log_dir.display());

    Ok(())
}
