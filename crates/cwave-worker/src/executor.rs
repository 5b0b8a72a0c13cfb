//! The queue polling loop.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};
use uuid::Uuid;

use cwave_models::decode_envelope;
use cwave_queue::{QueueConsumer, QueueResult, ReceivedMessage};

use crate::config::{AckPolicy, WorkerConfig};
use crate::error::WorkerResult;
use crate::metrics;
use crate::pipeline::AudioPipeline;

/// Queue operations the loop needs.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    async fn receive(&self) -> QueueResult<Vec<ReceivedMessage>>;
    async fn delete(&self, receipt_handle: &str) -> QueueResult<()>;
}

#[async_trait]
impl MessageQueue for QueueConsumer {
    async fn receive(&self) -> QueueResult<Vec<ReceivedMessage>> {
        QueueConsumer::receive(self).await
    }

    async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        QueueConsumer::delete(self, receipt_handle).await
    }
}

/// Worker loop: fetch at most one batch, process it to completion, repeat.
///
/// One message is in flight at a time per instance; throughput scales by
/// running more instances, coordinated only by the queue's own in-flight
/// exclusivity.
pub struct WorkerLoop {
    config: WorkerConfig,
    queue: Arc<dyn MessageQueue>,
    pipeline: AudioPipeline,
    shutdown: tokio::sync::watch::Sender<bool>,
    worker_name: String,
}

impl WorkerLoop {
    /// Create a new worker loop.
    pub fn new(config: WorkerConfig, queue: Arc<dyn MessageQueue>, pipeline: AudioPipeline) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let worker_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue,
            pipeline,
            shutdown,
            worker_name,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting worker loop '{}' polling every {:?}",
            self.worker_name, self.config.poll_interval
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping worker loop");
                break;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping worker loop");
                        break;
                    }
                }
                result = self.poll_once() => {
                    let idle = match result {
                        Ok(processed) => !processed,
                        Err(e) => {
                            error!("Error polling queue: {}", e);
                            true
                        }
                    };

                    if idle {
                        tokio::select! {
                            _ = shutdown_rx.changed() => {
                                if *shutdown_rx.borrow() {
                                    info!("Shutdown signal received, stopping worker loop");
                                    break;
                                }
                            }
                            _ = tokio::time::sleep(self.config.poll_interval) => {}
                        }
                    }
                }
            }
        }

        info!("Worker loop stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Receive one batch and process it. Returns whether anything arrived.
    async fn poll_once(&self) -> WorkerResult<bool> {
        let messages = self.queue.receive().await?;

        if messages.is_empty() {
            metrics::record_empty_poll();
            return Ok(false);
        }

        for message in messages {
            self.handle_message(message).await;
        }

        Ok(true)
    }

    /// Process a single message to completion and acknowledge per policy.
    async fn handle_message(&self, message: ReceivedMessage) {
        let event = match decode_envelope(&message.body) {
            Ok(event) => event,
            Err(e) => {
                // Unprocessable now, unprocessable on redelivery; the queue's
                // own retry/dead-letter policy owns its fate, so the receipt
                // is left alone.
                warn!("Undecodable message left for queue policy: {}", e);
                metrics::record_decode_failure();
                return;
            }
        };

        info!(file_name = %event.file_name, "Received upload notification");
        let started = Instant::now();

        match self.pipeline.process(&event).await {
            Ok(outcome) => {
                metrics::record_message_processed(started.elapsed().as_secs_f64());
                info!(
                    file_name = %event.file_name,
                    output_key = %outcome.output_key,
                    "Message processed"
                );

                if let Err(e) = self.queue.delete(&message.receipt_handle).await {
                    error!(file_name = %event.file_name, "Failed to ack message: {}", e);
                }
            }
            Err(e) => {
                metrics::record_message_failed(e.stage());
                error!(
                    file_name = %event.file_name,
                    stage = %e.stage(),
                    "Message processing failed: {}", e
                );

                if self.config.ack_policy == AckPolicy::AlwaysDelete {
                    if let Err(del_err) = self.queue.delete(&message.receipt_handle).await {
                        error!(file_name = %event.file_name, "Failed to delete message: {}", del_err);
                    }
                }
                // AckOnSuccess leaves the message in flight; it reappears
                // after the visibility timeout.
            }
        }
    }
}
