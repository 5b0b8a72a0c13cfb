//! Structured per-message logging.

use tracing::{error, info, warn};

/// Logger for the lifecycle of one queue message, keyed by the object it
/// references.
#[derive(Debug, Clone)]
pub struct MessageLogger {
    file_name: String,
}

impl MessageLogger {
    /// Create a logger for the message referencing `file_name`.
    pub fn new(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
        }
    }

    /// Log the start of processing.
    pub fn log_start(&self) {
        info!(file_name = %self.file_name, "Processing upload");
    }

    /// Log a completed pipeline stage.
    pub fn log_stage(&self, stage: &str, message: &str) {
        info!(file_name = %self.file_name, stage = %stage, "{}", message);
    }

    /// Log a warning during processing.
    pub fn log_warning(&self, message: &str) {
        warn!(file_name = %self.file_name, "{}", message);
    }

    /// Log a processing failure.
    pub fn log_error(&self, stage: &str, message: &str) {
        error!(file_name = %self.file_name, stage = %stage, "{}", message);
    }

    /// Log successful completion.
    pub fn log_completion(&self, message: &str) {
        info!(file_name = %self.file_name, "{}", message);
    }

    /// Get the object key this logger is scoped to.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_logger_creation() {
        let logger = MessageLogger::new("audio_1700000000000.webm");
        assert_eq!(logger.file_name(), "audio_1700000000000.webm");
    }
}
