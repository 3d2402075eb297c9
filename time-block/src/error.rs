//! src/error.rs
//! ============================================================================
//! # `TimeBlockError`: Unified Error Type for the Profiler
//!
//! Measurement itself never fails the caller: a wrapped region's own error is
//! handed back untouched. This enum covers the profiler's surrounding
//! machinery instead: memory sampling, configuration, and state transfer.

use std::{io, path::PathBuf};
use thiserror::Error;

/// Unified error type for profiler operations.
#[derive(Debug, Error)]
pub enum TimeBlockError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The resident-memory reader could not produce a value.
    #[error("Memory read failed: {0}")]
    MemoryRead(String),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML config rendering error.
    #[error("Config render error: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    /// Config file I/O error with path.
    #[error("Failed to access config file {path:?}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON (de)serialization of a state snapshot.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// MessagePack encoding of a state snapshot.
    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MessagePack decoding of a state snapshot.
    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl TimeBlockError {
    #[must_use]
    /// Attach extra context to an error.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// Create a memory read error
    pub fn memory_read<S: Into<String>>(reason: S) -> Self {
        Self::MemoryRead(reason.into())
    }

    /// Create a config I/O error for `path`
    pub fn config_io<P: Into<PathBuf>>(path: P, source: io::Error) -> Self {
        Self::ConfigIo {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_wraps_message() {
        let err = TimeBlockError::memory_read("no such process").with_context("scope `load`");
        assert_eq!(
            err.to_string(),
            "Unexpected error: scope `load`: Memory read failed: no such process"
        );
    }

    #[test]
    fn test_config_io_names_path() {
        let err = TimeBlockError::config_io(
            "/tmp/missing.toml",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
