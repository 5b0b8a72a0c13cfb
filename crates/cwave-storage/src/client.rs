//! Object store client implementation.

use std::path::Path;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the object store client.
#[derive(Debug, Clone, Default)]
pub struct ObjectStoreConfig {
    /// Endpoint URL override (LocalStack/MinIO). `None` uses the real service.
    pub endpoint_url: Option<String>,
    /// Region. Defaults to us-east-1.
    pub region: Option<String>,
    /// Static access key. `None` defers to the default credential chain.
    pub access_key_id: Option<String>,
    /// Static secret key. `None` defers to the default credential chain.
    pub secret_access_key: Option<String>,
}

impl ObjectStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var("AWS_ENDPOINT_URL").ok(),
            region: std::env::var("AWS_REGION").ok(),
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

/// Object store client addressing blobs by bucket and key.
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Client,
}

impl ObjectStoreClient {
    /// Create a new client from configuration.
    pub async fn new(config: ObjectStoreConfig) -> StorageResult<Self> {
        let region = Region::new(config.region.unwrap_or_else(|| "us-east-1".to_string()));

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .load()
            .await;

        let mut builder = Builder::from(&sdk_config);

        if let Some(ref endpoint) = config.endpoint_url {
            // Emulated backends route by path, not virtual host
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        if let (Some(key), Some(secret)) = (config.access_key_id, config.secret_access_key) {
            builder = builder.credentials_provider(Credentials::new(key, secret, None, None, "static"));
        }

        let client = Client::from_conf(builder.build());

        Ok(Self { client })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(ObjectStoreConfig::from_env()).await
    }

    /// Upload a file.
    pub async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}/{}", path.display(), bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}/{}", path.display(), bucket, key);
        Ok(())
    }

    /// Upload bytes.
    pub async fn upload_bytes(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}/{}", data.len(), bucket, key);

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        Ok(())
    }

    /// Download an object as bytes.
    pub async fn download_bytes(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        debug!("Downloading {}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.to_string().contains("NoSuchKey") {
                    StorageError::not_found(key)
                } else {
                    StorageError::DownloadFailed(e.to_string())
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(bytes)
    }

    /// Download an object to a file.
    pub async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Downloading {}/{} to {}", bucket, key, path.display());

        let bytes = self.download_bytes(bucket, key).await?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::DownloadFailed(format!("Failed to create directory: {}", e))
            })?;
        }

        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| StorageError::DownloadFailed(format!("Failed to write file: {}", e)))?;

        info!("Downloaded {}/{} to {}", bucket, key, path.display());
        Ok(())
    }

    /// Check if an object exists.
    pub async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey") {
                    Ok(false)
                } else {
                    Err(StorageError::AwsSdk(e.to_string()))
                }
            }
        }
    }

    /// Create the bucket if it does not exist yet.
    ///
    /// Local emulation starts with an empty store; production buckets are
    /// provisioned out of band and this degenerates to a head call.
    pub async fn ensure_bucket(&self, bucket: &str) -> StorageResult<()> {
        if self
            .client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .is_ok()
        {
            return Ok(());
        }

        match self.client.create_bucket().bucket(bucket).send().await {
            Ok(_) => {
                info!("Created bucket {}", bucket);
                Ok(())
            }
            Err(e) => {
                let msg = e.to_string();
                // Another instance may have raced the creation
                if msg.contains("BucketAlreadyOwnedByYou") || msg.contains("BucketAlreadyExists") {
                    Ok(())
                } else {
                    Err(StorageError::BucketCreateFailed(msg))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_builds_with_endpoint_override() {
        // Credential resolution is lazy; construction never touches the
        // network.
        let config = ObjectStoreConfig {
            endpoint_url: Some("http://localhost:4566".to_string()),
            region: Some("us-east-1".to_string()),
            access_key_id: Some("test".to_string()),
            secret_access_key: Some("test".to_string()),
        };
        assert!(ObjectStoreClient::new(config).await.is_ok());
    }
}
