//! Upload notification publisher.

use aws_config::BehaviorVersion;
use aws_sdk_sns::config::Region;
use aws_sdk_sns::Client;
use tracing::info;

use cwave_models::UploadEvent;

use crate::error::{QueueError, QueueResult};

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Topic to publish upload notifications to.
    pub topic_arn: String,
    /// Endpoint URL override for local emulation.
    pub endpoint_url: Option<String>,
    /// Region.
    pub region: Option<String>,
}

impl PublisherConfig {
    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Ok(Self {
            topic_arn: std::env::var("TOPIC_ARN")
                .map_err(|_| QueueError::config_error("TOPIC_ARN not set"))?,
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").ok(),
        })
    }
}

/// Publishes upload events to the notification topic.
///
/// The topic delivery wraps the serialized event into the notification
/// envelope consumed by the worker; this client only emits the inner payload.
#[derive(Debug)]
pub struct NotificationPublisher {
    client: Client,
    config: PublisherConfig,
}

impl NotificationPublisher {
    /// Create a new publisher from configuration.
    pub async fn new(config: PublisherConfig) -> QueueResult<Self> {
        if config.topic_arn.is_empty() {
            return Err(QueueError::config_error("topic ARN is empty"));
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

        let mut builder = aws_sdk_sns::config::Builder::from(&sdk_config);
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
        Self::new(PublisherConfig::from_env()?).await
    }

    /// Publish an upload event.
    pub async fn publish(&self, event: &UploadEvent) -> QueueResult<()> {
        let payload = serde_json::to_string(event)?;

        self.client
            .publish()
            .topic_arn(&self.config.topic_arn)
            .message(payload)
            .send()
            .await
            .map_err(|e| QueueError::publish_failed(e.to_string()))?;

        info!("Published upload notification for {}", event.file_name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_topic_arn_rejected() {
        let config = PublisherConfig {
            topic_arn: String::new(),
            endpoint_url: None,
            region: None,
        };
        let err = NotificationPublisher::new(config).await.unwrap_err();
        assert!(matches!(err, QueueError::ConfigError(_)));
    }
}
