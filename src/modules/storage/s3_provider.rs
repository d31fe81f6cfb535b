//! Cloud object storage provider (AWS S3 and S3-compatible clouds).

use std::time::Duration;

use async_trait::async_trait;
use s3::Region;
use tracing::info;

use super::config::StorageConfig;
use super::error::StorageError;
use super::provider::{ObjectReader, ObjectStream, StorageProvider};
use super::s3_compat::{AddressingStyle, S3CompatClient};

pub struct S3Provider {
    client: S3CompatClient,
    region_name: String,
    default_bucket: String,
}

impl S3Provider {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        if config.region.trim().is_empty() {
            return Err(StorageError::configuration("S3 region is required"));
        }
        if config.access_key.is_empty() || config.secret_key.is_empty() {
            return Err(StorageError::configuration(
                "S3 access key and secret key are required",
            ));
        }

        let region = Self::region(config)?;

        let style = if config.option_flag("path_style", false) {
            AddressingStyle::Path
        } else {
            AddressingStyle::VirtualHost
        };

        let client = S3CompatClient::new(region, &config.access_key, &config.secret_key, style)?;

        Ok(Self {
            client,
            region_name: config.region.clone(),
            default_bucket: config.default_bucket.clone(),
        })
    }

    /// AWS regions resolve by name; any other endpoint (R2, Spaces, ...) is
    /// used as given when the `custom_endpoint` option is set.
    fn region(config: &StorageConfig) -> Result<Region, StorageError> {
        if config.option_flag("custom_endpoint", false) {
            return Ok(Region::Custom {
                region: config.region.clone(),
                endpoint: config.endpoint_url(),
            });
        }

        config
            .region
            .parse::<Region>()
            .map_err(|e| StorageError::configuration(format!("Invalid S3 region: {}", e)))
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        self.ensure_bucket(&self.default_bucket).await?;

        info!(
            "S3 provider initialized for region: {}, bucket: {}",
            self.region_name, self.default_bucket
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
