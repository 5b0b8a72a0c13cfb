//! The per-message transform pipeline.
//!
//! Fetch the uploaded clip, normalize it to the canonical waveform format,
//! denoise it, and publish the result under the derived output key. Every
//! intermediate artifact lives in a per-message scratch directory that is
//! removed on all exit paths.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use cwave_media::{
    denoise_wav_file, transcode_to_wav, Denoiser, FfmpegRunner, MediaResult, WaveformSpec,
};
use cwave_models::{UploadEvent, CONTENT_TYPE_WAV};
use cwave_storage::{ObjectStoreClient, StorageResult};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::MessageLogger;

/// Object store operations the pipeline needs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()>;

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()>;
}

#[async_trait]
impl ObjectStore for ObjectStoreClient {
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        ObjectStoreClient::download_file(self, bucket, key, path).await
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> StorageResult<()> {
        ObjectStoreClient::upload_file(self, bucket, key, path, content_type).await
    }
}

/// The transcode capability.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        spec: &WaveformSpec,
    ) -> MediaResult<()>;
}

/// FFmpeg-backed transcoder with bounded execution time.
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        spec: &WaveformSpec,
    ) -> MediaResult<()> {
        transcode_to_wav(input, output, spec, &self.runner).await
    }
}

/// Result of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Key the processed waveform was stored under.
    pub output_key: String,
}

/// The transform pipeline for one worker instance.
pub struct AudioPipeline {
    config: WorkerConfig,
    store: Arc<dyn ObjectStore>,
    transcoder: Arc<dyn Transcoder>,
    denoiser: Arc<dyn Denoiser>,
}

impl AudioPipeline {
    /// Create a pipeline from explicitly constructed collaborators.
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn ObjectStore>,
        transcoder: Arc<dyn Transcoder>,
        denoiser: Arc<dyn Denoiser>,
    ) -> Self {
        Self {
            config,
            store,
            transcoder,
            denoiser,
        }
    }

    /// Process one upload event to completion.
    ///
    /// Stages run strictly in sequence; the first failure aborts the run and
    /// no partial output is written. The scratch directory is dropped on
    /// every path out of this function, releasing all temporary artifacts.
    pub async fn process(&self, event: &UploadEvent) -> WorkerResult<PipelineOutcome> {
        let logger = MessageLogger::new(&event.file_name);

        if let Some(ref bucket) = event.bucket_name {
            if bucket != &self.config.input_bucket {
                warn!(
                    event_bucket = %bucket,
                    configured_bucket = %self.config.input_bucket,
                    "Event bucket differs from configured input bucket; using configured"
                );
            }
        }

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix("cwave-")
            .tempdir_in(&self.config.work_dir)?;

        let input_path = scratch.path().join(scratch_input_name(&event.file_name));
        self.store
            .download_file(&self.config.input_bucket, &event.file_name, &input_path)
            .await
            .map_err(WorkerError::Fetch)?;
        logger.log_stage("fetch", "Downloaded input object");

        let transcoded_path = scratch.path().join("canonical.wav");
        self.transcoder
            .transcode(&input_path, &transcoded_path, &self.config.waveform)
            .await
            .map_err(WorkerError::Transcode)?;
        logger.log_stage("transcode", "Normalized to canonical waveform");

        let denoised_path = scratch.path().join("denoised.wav");
        denoise_wav_file(&transcoded_path, &denoised_path, self.denoiser.as_ref())
            .map_err(WorkerError::Denoise)?;
        logger.log_stage("denoise", "Noise reduction complete");

        let output_key = self.config.output_key.derive(&event.file_name);
        self.store
            .upload_file(
                &self.config.output_bucket,
                &output_key,
                &denoised_path,
                CONTENT_TYPE_WAV,
            )
            .await
            .map_err(WorkerError::Upload)?;
        logger.log_completion(&format!(
            "Stored processed waveform as {}/{}",
            self.config.output_bucket, output_key
        ));

        Ok(PipelineOutcome { output_key })
    }
}

/// Scratch file name for the fetched input.
///
/// Keys may contain prefix segments; only the extension survives so FFmpeg
/// gets a container hint without the scratch path depending on key contents.
fn scratch_input_name(key: &str) -> String {
    let segment = key.rsplit('/').next().unwrap_or(key);
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => format!("input.{}", ext),
        _ => "input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_input_name() {
        assert_eq!(scratch_input_name("audio_1700000000000.webm"), "input.webm");
        assert_eq!(scratch_input_name("uploads/clip.ogg"), "input.ogg");
        assert_eq!(scratch_input_name("rawcapture"), "input");
        assert_eq!(scratch_input_name(".hidden"), "input");
    }
}
