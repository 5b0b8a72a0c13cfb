//! Application state.

use std::sync::Arc;

use cwave_queue::NotificationPublisher;
use cwave_storage::ObjectStoreClient;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<ObjectStoreClient>,
    pub publisher: Arc<NotificationPublisher>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = ObjectStoreClient::from_env().await?;
        let publisher = NotificationPublisher::from_env().await?;

        // Local emulation starts empty; production buckets already exist
        storage.ensure_bucket(&config.input_bucket).await?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            publisher: Arc::new(publisher),
        })
    }
}
