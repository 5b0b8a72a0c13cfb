//! Audio denoising worker.
//!
//! This crate provides:
//! - The queue polling loop with idle delay and graceful shutdown
//! - The per-message transform pipeline (fetch, transcode, denoise, publish)
//! - Scoped temporary-artifact lifecycle
//! - Worker configuration and metrics

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;

pub use config::{AckPolicy, WorkerConfig};
pub use error::{WorkerError, WorkerResult};
pub use executor::{MessageQueue, WorkerLoop};
pub use logging::MessageLogger;
pub use pipeline::{AudioPipeline, FfmpegTranscoder, ObjectStore, PipelineOutcome, Transcoder};
