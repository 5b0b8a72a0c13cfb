//! Pipeline and worker loop tests with in-memory collaborators.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use cwave_media::{Denoiser, MediaError, MediaResult, WaveformSpec};
use cwave_models::{Notification, UploadEvent};
use cwave_queue::{QueueResult, ReceivedMessage};
use cwave_storage::{StorageError, StorageResult};
use cwave_worker::{
    AckPolicy, AudioPipeline, MessageQueue, ObjectStore, Transcoder, WorkerConfig, WorkerError,
    WorkerLoop,
};

/// Object store backed by a map, with injectable upload failure.
#[derive(Default)]
struct InMemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    fail_uploads: bool,
}

impl InMemoryStore {
    fn seed(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.objects
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    fn bucket_len(&self, bucket: &str) -> usize {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> StorageResult<()> {
        let data = self.get(bucket, key);
        match data {
            Some(bytes) => {
                tokio::fs::write(path, bytes)
                    .await
                    .map_err(StorageError::Io)?;
                Ok(())
            }
            None => Err(StorageError::not_found(key)),
        }
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> StorageResult<()> {
        if self.fail_uploads {
            return Err(StorageError::upload_failed("injected upload failure"));
        }
        let bytes = tokio::fs::read(path).await.map_err(StorageError::Io)?;
        self.seed(bucket, key, bytes);
        Ok(())
    }
}

/// Transcoder that copies input to output unchanged (inputs are already WAV).
struct CopyTranscoder;

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        _spec: &WaveformSpec,
    ) -> MediaResult<()> {
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

/// Transcoder that always fails.
struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode(
        &self,
        _input: &Path,
        _output: &Path,
        _spec: &WaveformSpec,
    ) -> MediaResult<()> {
        Err(MediaError::ffmpeg_failed("injected transcode failure", None, Some(1)))
    }
}

/// Denoiser that returns its input unchanged.
struct IdentityDenoiser;

impl Denoiser for IdentityDenoiser {
    fn denoise(&self, samples: &[f32], _sample_rate: u32) -> Vec<f32> {
        samples.to_vec()
    }
}

/// Queue backed by a deque, recording receive times and deletions.
#[derive(Default)]
struct FakeQueue {
    messages: Mutex<VecDeque<ReceivedMessage>>,
    receive_times: Mutex<Vec<tokio::time::Instant>>,
    deleted: Mutex<Vec<String>>,
}

impl FakeQueue {
    fn push(&self, receipt_handle: &str, body: &str) {
        self.messages.lock().unwrap().push_back(ReceivedMessage {
            receipt_handle: receipt_handle.to_string(),
            body: body.to_string(),
        });
    }

    fn receive_count(&self) -> usize {
        self.receive_times.lock().unwrap().len()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageQueue for FakeQueue {
    async fn receive(&self) -> QueueResult<Vec<ReceivedMessage>> {
        self.receive_times
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        Ok(self.messages.lock().unwrap().pop_front().into_iter().collect())
    }

    async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        self.deleted
            .lock()
            .unwrap()
            .push(receipt_handle.to_string());
        Ok(())
    }
}

/// 16-bit mono WAV bytes for the given samples.
fn wav_bytes(samples: &[i16]) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn wav_samples(bytes: &[u8]) -> Vec<i16> {
    let mut reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
    reader.samples::<i16>().map(|s| s.unwrap()).collect()
}

fn envelope_body(bucket: &str, file_name: &str) -> String {
    let inner = serde_json::to_string(&UploadEvent::new(bucket, file_name)).unwrap();
    serde_json::to_string(&Notification { message: inner }).unwrap()
}

struct TestRig {
    config: WorkerConfig,
    store: Arc<InMemoryStore>,
    _work_dir: tempfile::TempDir,
}

fn rig() -> TestRig {
    let work_dir = tempfile::TempDir::new().unwrap();
    let config = WorkerConfig {
        work_dir: work_dir.path().to_path_buf(),
        ..WorkerConfig::default()
    };

    TestRig {
        config,
        store: Arc::new(InMemoryStore::default()),
        _work_dir: work_dir,
    }
}

fn pipeline_with(
    rig: &TestRig,
    transcoder: Arc<dyn Transcoder>,
) -> AudioPipeline {
    AudioPipeline::new(
        rig.config.clone(),
        Arc::clone(&rig.store) as Arc<dyn ObjectStore>,
        transcoder,
        Arc::new(IdentityDenoiser),
    )
}

fn scratch_entries(config: &WorkerConfig) -> usize {
    std::fs::read_dir(&config.work_dir)
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[tokio::test]
async fn test_round_trip_produces_output_under_derived_key() {
    let rig = rig();
    let samples: Vec<i16> = (0..4000).map(|i| ((i % 200) as i16 - 100) * 50).collect();
    rig.store.seed(
        "my-audio-bucket",
        "audio_1700000000000.webm",
        wav_bytes(&samples),
    );

    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let event = UploadEvent::new("my-audio-bucket", "audio_1700000000000.webm");

    let outcome = pipeline.process(&event).await.unwrap();
    assert_eq!(outcome.output_key, "audio_1700000000000_processed.wav");

    // Input untouched, output present with the same sample content
    assert!(rig
        .store
        .get("my-audio-bucket", "audio_1700000000000.webm")
        .is_some());
    let output = rig
        .store
        .get("my-audio-output-bucket", "audio_1700000000000_processed.wav")
        .expect("output object missing");

    let round_tripped = wav_samples(&output);
    assert_eq!(round_tripped.len(), samples.len());
    for (a, b) in samples.iter().zip(round_tripped.iter()) {
        assert!((a - b).abs() <= 1, "sample drifted: {} vs {}", a, b);
    }

    assert_eq!(scratch_entries(&rig.config), 0);
}

#[tokio::test]
async fn test_fetch_failure_writes_nothing_and_cleans_up() {
    let rig = rig();
    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let event = UploadEvent::new("my-audio-bucket", "missing.webm");

    let err = pipeline.process(&event).await.unwrap_err();
    assert!(matches!(err, WorkerError::Fetch(_)));
    assert_eq!(rig.store.bucket_len("my-audio-output-bucket"), 0);
    assert_eq!(scratch_entries(&rig.config), 0);
}

#[tokio::test]
async fn test_transcode_failure_writes_nothing_and_cleans_up() {
    let rig = rig();
    rig.store
        .seed("my-audio-bucket", "clip.webm", wav_bytes(&[0i16; 64]));

    let pipeline = pipeline_with(&rig, Arc::new(FailingTranscoder));
    let event = UploadEvent::new("my-audio-bucket", "clip.webm");

    let err = pipeline.process(&event).await.unwrap_err();
    assert!(matches!(err, WorkerError::Transcode(_)));
    assert_eq!(rig.store.bucket_len("my-audio-output-bucket"), 0);
    assert_eq!(scratch_entries(&rig.config), 0);
}

#[tokio::test]
async fn test_denoise_failure_writes_nothing_and_cleans_up() {
    let rig = rig();
    // Not a WAV; the copy transcoder passes it through and the denoise
    // stage fails to read it.
    rig.store
        .seed("my-audio-bucket", "clip.webm", b"definitely not audio".to_vec());

    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let event = UploadEvent::new("my-audio-bucket", "clip.webm");

    let err = pipeline.process(&event).await.unwrap_err();
    assert!(matches!(err, WorkerError::Denoise(_)));
    assert_eq!(rig.store.bucket_len("my-audio-output-bucket"), 0);
    assert_eq!(scratch_entries(&rig.config), 0);
}

#[tokio::test]
async fn test_upload_failure_cleans_up() {
    let work_dir = tempfile::TempDir::new().unwrap();
    let config = WorkerConfig {
        work_dir: work_dir.path().to_path_buf(),
        ..WorkerConfig::default()
    };
    let store = Arc::new(InMemoryStore {
        fail_uploads: true,
        ..InMemoryStore::default()
    });
    store.seed("my-audio-bucket", "clip.webm", wav_bytes(&[0i16; 64]));

    let pipeline = AudioPipeline::new(
        config.clone(),
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        Arc::new(CopyTranscoder),
        Arc::new(IdentityDenoiser),
    );

    let err = pipeline
        .process(&UploadEvent::new("my-audio-bucket", "clip.webm"))
        .await
        .unwrap_err();
    assert!(matches!(err, WorkerError::Upload(_)));
    assert_eq!(scratch_entries(&config), 0);
}

#[tokio::test]
async fn test_event_bucket_is_informational() {
    let rig = rig();
    rig.store
        .seed("my-audio-bucket", "clip.webm", wav_bytes(&[100i16; 512]));

    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    // Event claims another bucket; the configured input bucket wins.
    let event = UploadEvent::new("somewhere-else", "clip.webm");

    let outcome = pipeline.process(&event).await.unwrap();
    assert!(rig
        .store
        .get("my-audio-output-bucket", &outcome.output_key)
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_empty_queue_sleeps_between_polls() {
    let rig = rig();
    let queue = Arc::new(FakeQueue::default());
    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let worker = Arc::new(WorkerLoop::new(
        rig.config.clone(),
        Arc::clone(&queue) as Arc<dyn MessageQueue>,
        pipeline,
    ));

    let run_worker = Arc::clone(&worker);
    let handle = tokio::spawn(async move { run_worker.run().await });

    tokio::time::sleep(Duration::from_secs(12)).await;
    worker.shutdown();
    handle.await.unwrap().unwrap();

    // Polls at ~0s, ~5s and ~10s; nothing ever deleted
    let times = queue.receive_times.lock().unwrap().clone();
    assert!(times.len() >= 3, "expected at least 3 polls, got {}", times.len());
    for pair in times.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap >= Duration::from_secs(5) && gap < Duration::from_secs(6),
            "unexpected poll gap: {:?}",
            gap
        );
    }
    assert!(queue.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_successful_message_is_deleted() {
    let rig = rig();
    rig.store
        .seed("my-audio-bucket", "clip.webm", wav_bytes(&[500i16; 1024]));

    let queue = Arc::new(FakeQueue::default());
    queue.push("receipt-1", &envelope_body("my-audio-bucket", "clip.webm"));

    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let worker = Arc::new(WorkerLoop::new(
        rig.config.clone(),
        Arc::clone(&queue) as Arc<dyn MessageQueue>,
        pipeline,
    ));

    let run_worker = Arc::clone(&worker);
    let handle = tokio::spawn(async move { run_worker.run().await });

    while queue.deleted().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.shutdown();
    handle.await.unwrap().unwrap();

    assert_eq!(queue.deleted(), vec!["receipt-1".to_string()]);
    assert!(rig
        .store
        .get("my-audio-output-bucket", "clip_processed.wav")
        .is_some());
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_message_is_not_deleted() {
    let rig = rig();
    let queue = Arc::new(FakeQueue::default());
    queue.push("receipt-bad", "{not json");

    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let worker = Arc::new(WorkerLoop::new(
        rig.config.clone(),
        Arc::clone(&queue) as Arc<dyn MessageQueue>,
        pipeline,
    ));

    let run_worker = Arc::clone(&worker);
    let handle = tokio::spawn(async move { run_worker.run().await });

    while queue.receive_count() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.shutdown();
    handle.await.unwrap().unwrap();

    assert!(queue.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_message_is_kept_under_ack_on_success() {
    let rig = rig();
    let queue = Arc::new(FakeQueue::default());
    // Object is missing, so the fetch stage fails
    queue.push("receipt-2", &envelope_body("my-audio-bucket", "gone.webm"));

    let pipeline = pipeline_with(&rig, Arc::new(CopyTranscoder));
    let worker = Arc::new(WorkerLoop::new(
        rig.config.clone(),
        Arc::clone(&queue) as Arc<dyn MessageQueue>,
        pipeline,
    ));

    let run_worker = Arc::clone(&worker);
    let handle = tokio::spawn(async move { run_worker.run().await });

    while queue.receive_count() < 2 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.shutdown();
    handle.await.unwrap().unwrap();

    assert!(queue.deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_message_is_deleted_under_always_delete() {
    let work_dir = tempfile::TempDir::new().unwrap();
    let config = WorkerConfig {
        work_dir: work_dir.path().to_path_buf(),
        ack_policy: AckPolicy::AlwaysDelete,
        ..WorkerConfig::default()
    };

    let store = Arc::new(InMemoryStore::default());
    let queue = Arc::new(FakeQueue::default());
    queue.push("receipt-3", &envelope_body("my-audio-bucket", "gone.webm"));

    let pipeline = AudioPipeline::new(
        config.clone(),
        Arc::clone(&store) as Arc<dyn ObjectStore>,
        Arc::new(CopyTranscoder),
        Arc::new(IdentityDenoiser),
    );
    let worker = Arc::new(WorkerLoop::new(
        config,
        Arc::clone(&queue) as Arc<dyn MessageQueue>,
        pipeline,
    ));

    let run_worker = Arc::clone(&worker);
    let handle = tokio::spawn(async move { run_worker.run().await });

    while queue.deleted().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    worker.shutdown();
    handle.await.unwrap().unwrap();

    assert_eq!(queue.deleted(), vec!["receipt-3".to_string()]);
}
