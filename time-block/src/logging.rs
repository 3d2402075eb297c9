//! Subscriber setup for programs that want the notices and diagnostics
//! without wiring `tracing-subscriber` themselves.

use std::{path::PathBuf, str::FromStr};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Directive, layer::SubscriberExt, util::SubscriberInitExt,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Directive applied on top of `RUST_LOG`, e.g. `debug` or `time_block=debug`
    pub log_level: String,
    /// Also write JSON lines here when set
    pub log_dir: Option<PathBuf>,
    pub log_file_prefix: String,
    pub max_log_files: usize,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRotation {
    Never,
    Daily,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Daily => Rotation::DAILY,
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
            log_file_prefix: "time_block".to_string(),
            max_log_files: 10,
            rotation: LogRotation::Daily,
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn with_level(mut self, level: &str) -> Self {
        self.log_level = level.to_string();
        self
    }

    #[must_use]
    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logger already initialized")]
    AlreadyInitialized,

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),
}

fn make_filter(level: &str) -> Result<EnvFilter> {
    let directive =
        Directive::from_str(level).map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// Install the global subscriber: human-readable output on stderr, plus a
/// rolling JSON file when `log_dir` is set.
///
/// Keep the returned guard alive for as long as file output is wanted; it
/// flushes the background writer on drop.
pub fn init_logging(config: &LoggerConfig) -> Result<Option<WorkerGuard>> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(make_filter(&config.log_level)?);

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(config.rotation.into())
                .filename_prefix(config.log_file_prefix.as_str())
                .filename_suffix("jsonl")
                .max_log_files(config.max_log_files)
                .build(dir)
                .with_context(|| format!("Failed to create file appender in {}", dir.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(make_filter(&config.log_level)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(guard)
}

/// `init_logging` with everything default except the level.
pub fn init_logging_with_level(level: &str) -> Result<Option<WorkerGuard>> {
    init_logging(&LoggerConfig::default().with_level(level))
}
