//! Worker error types.
//!
//! Pipeline errors carry the stage they happened in so the loop can log and
//! count failures per stage instead of swallowing them uniformly.

use thiserror::Error;

use cwave_media::MediaError;
use cwave_models::DecodeError;
use cwave_queue::QueueError;
use cwave_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Envelope decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Fetch failed: {0}")]
    Fetch(#[source] StorageError),

    #[error("Transcode failed: {0}")]
    Transcode(#[source] MediaError),

    #[error("Denoise failed: {0}")]
    Denoise(#[source] MediaError),

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("Queue operation failed: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Pipeline stage the error belongs to, for logs and metrics labels.
    pub fn stage(&self) -> &'static str {
        match self {
            WorkerError::Decode(_) => "decode",
            WorkerError::Fetch(_) => "fetch",
            WorkerError::Transcode(_) => "transcode",
            WorkerError::Denoise(_) => "denoise",
            WorkerError::Upload(_) => "upload",
            WorkerError::Queue(_) => "queue",
            WorkerError::ConfigError(_) => "config",
            WorkerError::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_labels() {
        let err = WorkerError::Fetch(StorageError::not_found("missing.webm"));
        assert_eq!(err.stage(), "fetch");

        let err = WorkerError::Transcode(MediaError::FfmpegNotFound);
        assert_eq!(err.stage(), "transcode");
    }
}
