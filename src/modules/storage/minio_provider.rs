//! Self-hosted MinIO (or any S3-compatible server) provider.

use std::time::Duration;

use async_trait::async_trait;
use s3::Region;
use tracing::info;

use super::config::StorageConfig;
use super::error::StorageError;
use super::provider::{ObjectReader, ObjectStream, StorageProvider};
use super::s3_compat::{AddressingStyle, S3CompatClient};

pub struct MinioProvider {
    client: S3CompatClient,
    endpoint: String,
    default_bucket: String,
}

impl MinioProvider {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.endpoint.trim().is_empty() {
            return Err(StorageError::configuration("MinIO endpoint is required"));
        }

        let endpoint = config.endpoint_url();
        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: endpoint.clone(),
        };

        // MinIO needs path-style URLs (http://endpoint/bucket instead of http://bucket.endpoint)
        let client = S3CompatClient::new(
            region,
            &config.access_key,
            &config.secret_key,
            AddressingStyle::Path,
        )?;

        Ok(Self {
            client,
            endpoint,
            default_bucket: config.default_bucket.clone(),
        })
    }
}

#[async_trait]
impl StorageProvider for MinioProvider {
    fn name(&self) -> &'static str {
        "minio"
    }

    fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        // A HEAD on the bucket exercises connectivity and credentials in one call
        self.ensure_bucket(&self.default_bucket).await?;

        info!(
            "MinIO provider initialized for endpoint: {}, bucket: {}",
            self.endpoint, self.default_bucket
        );
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        reader: ObjectReader,
        size: u64,
        content_type: &str,
    ) -> Result<String, StorageError> {
        self.client
            .upload(bucket, key, reader, size, content_type)
            .await
    }

    async fn download_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, StorageError> {
        self.client.download(bucket, key).await
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.client.delete(bucket, key).await
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        self.client.presign_get(bucket, key, ttl).await
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        self.client.bucket_exists(bucket).await
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.client.create_bucket(bucket).await
    }
}
