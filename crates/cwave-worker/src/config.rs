//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use cwave_media::WaveformSpec;
use cwave_models::OutputKeyPolicy;

/// What to do with a queue message whose processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckPolicy {
    /// Delete only after the pipeline succeeds; failed messages become
    /// visible again and follow the queue's redelivery/dead-letter policy.
    AckOnSuccess,
    /// Delete regardless of outcome. Failed uploads are dropped silently;
    /// kept as an opt-in for deployments that cannot tolerate redelivery.
    AlwaysDelete,
}

impl AckPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "ack_on_success" => Some(Self::AckOnSuccess),
            "always_delete" => Some(Self::AlwaysDelete),
            _ => None,
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Bucket uploaded clips are read from.
    pub input_bucket: String,
    /// Bucket processed waveforms are written to.
    pub output_bucket: String,
    /// Idle delay between empty polls.
    pub poll_interval: Duration,
    /// Directory per-message scratch dirs are created under.
    pub work_dir: PathBuf,
    /// Upper bound on a single transcode invocation.
    pub transcode_timeout: Duration,
    /// Message acknowledgment policy.
    pub ack_policy: AckPolicy,
    /// Output object naming.
    pub output_key: OutputKeyPolicy,
    /// Canonical waveform format.
    pub waveform: WaveformSpec,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            input_bucket: "my-audio-bucket".to_string(),
            output_bucket: "my-audio-output-bucket".to_string(),
            poll_interval: Duration::from_secs(5),
            work_dir: PathBuf::from("/tmp/cwave"),
            transcode_timeout: Duration::from_secs(120),
            ack_policy: AckPolicy::AckOnSuccess,
            output_key: OutputKeyPolicy::default(),
            waveform: WaveformSpec::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            input_bucket: std::env::var("INPUT_BUCKET").unwrap_or(defaults.input_bucket),
            output_bucket: std::env::var("OUTPUT_BUCKET").unwrap_or(defaults.output_bucket),
            poll_interval: Duration::from_secs(
                std::env::var("WORKER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            transcode_timeout: Duration::from_secs(
                std::env::var("WORKER_TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            ack_policy: std::env::var("WORKER_ACK_POLICY")
                .ok()
                .and_then(|s| AckPolicy::parse(&s))
                .unwrap_or(defaults.ack_policy),
            output_key: OutputKeyPolicy::new(
                std::env::var("OUTPUT_KEY_SUFFIX").unwrap_or_else(|_| "_processed".to_string()),
                std::env::var("OUTPUT_KEY_EXTENSION").unwrap_or_else(|_| "wav".to_string()),
            ),
            waveform: WaveformSpec {
                channels: std::env::var("WAVEFORM_CHANNELS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
                sample_rate: std::env::var("WAVEFORM_SAMPLE_RATE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(16_000),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.ack_policy, AckPolicy::AckOnSuccess);
        assert_eq!(config.output_key.suffix, "_processed");
        assert_eq!(config.waveform.sample_rate, 16_000);
    }

    #[test]
    fn test_ack_policy_parse() {
        assert_eq!(AckPolicy::parse("always_delete"), Some(AckPolicy::AlwaysDelete));
        assert_eq!(AckPolicy::parse("ACK_ON_SUCCESS"), Some(AckPolicy::AckOnSuccess));
        assert_eq!(AckPolicy::parse("sometimes"), None);
    }
}
