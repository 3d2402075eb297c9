//! Sinks for the per-scope "running" / duration lines

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::Level;

/// Receives one formatted line per scope start or stop.
///
/// Implementations must not block or fail the measurement; a sink that cannot
/// write drops the line.
pub trait NoticeSink: Send + Sync {
    fn notice(&self, line: &str);
}

/// Forwards notices to `tracing` under the `time_block` target.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: Level,
}

impl TracingSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl NoticeSink for TracingSink {
    fn notice(&self, line: &str) {
        match self.level {
            Level::ERROR => tracing::error!(target: "time_block", "{}", line),
            Level::WARN => tracing::warn!(target: "time_block", "{}", line),
            Level::INFO => tracing::info!(target: "time_block", "{}", line),
            Level::DEBUG => tracing::debug!(target: "time_block", "{}", line),
            _ => tracing::trace!(target: "time_block", "{}", line),
        }
    }
}

/// Keeps notices in memory, in emission order.
#[derive(Debug, Default, Clone)]
pub struct CaptureSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return everything captured so far
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl NoticeSink for CaptureSink {
    fn notice(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_shares_buffer_between_clones() {
        let sink = CaptureSink::new();
        let handle = sink.clone();
        sink.notice("a: running");
        sink.notice("a: 0.0s");

        assert_eq!(handle.lines(), vec!["a: running", "a: 0.0s"]);
        assert_eq!(handle.take().len(), 2);
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_tracing_sink_accepts_every_level() {
        for level in [Level::ERROR, Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            TracingSink::new(level).notice("x: running");
        }
    }
}
