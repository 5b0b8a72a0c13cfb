//! Queue consumer with receipt-handle semantics.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_sqs::config::Region;
use aws_sdk_sqs::Client;
use tracing::debug;

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue URL.
    pub queue_url: String,
    /// Endpoint URL override for local emulation.
    pub endpoint_url: Option<String>,
    /// Region.
    pub region: Option<String>,
    /// Maximum messages per receive call. Production batch size is 1.
    pub max_messages: i32,
    /// Server-side wait per receive call (0 = short poll).
    pub wait_time: Duration,
    /// How long a received message stays invisible before redelivery.
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_url: String::new(),
            endpoint_url: None,
            region: None,
            max_messages: 1,
            wait_time: Duration::from_secs(0),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Ok(Self {
            queue_url: std::env::var("QUEUE_URL")
                .map_err(|_| QueueError::config_error("QUEUE_URL not set"))?,
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").ok(),
            max_messages: std::env::var("QUEUE_MAX_MESSAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            wait_time: Duration::from_secs(
                std::env::var("QUEUE_WAIT_TIME_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
            ),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        })
    }
}

/// A message pulled off the queue, still in flight until deleted.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    /// Opaque token valid while the message is in flight.
    pub receipt_handle: String,
    /// Raw message body (the notification wrapper JSON).
    pub body: String,
}

/// Queue consumer client.
#[derive(Debug)]
pub struct QueueConsumer {
    client: Client,
    config: QueueConfig,
}

impl QueueConsumer {
    /// Create a new consumer from configuration.
    pub async fn new(config: QueueConfig) -> QueueResult<Self> {
        if config.queue_url.is_empty() {
            return Err(QueueError::config_error("queue URL is empty"));
        }

        let region = Region::new(
            config
                .region
                .clone()
                .unwrap_or_else(|| "us-east-1".to_string()),
        );

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut builder = aws_sdk_sqs::config::Builder::from(&sdk_config);
        if let Some(ref endpoint) = config.endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            config,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env()?).await
    }

    /// Receive up to `max_messages` messages.
    ///
    /// Returns an empty vec when the queue has nothing to deliver; the caller
    /// owns the idle delay between empty polls.
    pub async fn receive(&self) -> QueueResult<Vec<ReceivedMessage>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(self.config.max_messages)
            .wait_time_seconds(self.config.wait_time.as_secs() as i32)
            .visibility_timeout(self.config.visibility_timeout.as_secs() as i32)
            .send()
            .await
            .map_err(|e| QueueError::receive_failed(e.to_string()))?;

        let messages = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|m| {
                let receipt_handle = m.receipt_handle?;
                let body = m.body?;
                Some(ReceivedMessage {
                    receipt_handle,
                    body,
                })
            })
            .collect::<Vec<_>>();

        debug!("Received {} messages", messages.len());
        Ok(messages)
    }

    /// Delete a message, acknowledging it.
    ///
    /// The receipt handle must come from the current delivery; handles of
    /// messages that became visible again are rejected by the backend.
    pub async fn delete(&self, receipt_handle: &str) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::delete_failed(e.to_string()))?;

        debug!("Deleted message");
        Ok(())
    }

    /// Queue URL this consumer polls.
    pub fn queue_url(&self) -> &str {
        &self.config.queue_url
    }
}
