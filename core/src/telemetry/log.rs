use log::{debug, info, warn};

/// Thin wrapper over the `log` facade, tagging each line with its source.
pub struct LogManager {
    source: &'static str,
}

impl LogManager {
    pub fn new(source: &'static str) -> Self {
        Self { source }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.source, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.source, message);
    }

    /// Logs a skipped input line; only visible at debug level.
    pub fn skip(&self, line: &str, reason: &str) {
        debug!("[{}] skipping {:?}: {}", self.source, line, reason);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("motecore")
    }
}
