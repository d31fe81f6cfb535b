//! In-process storage provider.
//!
//! Keeps objects in memory; used for local development and tests. Not meant
//! for production data.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;

use super::config::StorageConfig;
use super::error::StorageError;
use super::provider::{ObjectReader, ObjectStream, StorageProvider};

/// Chunk size used when streaming objects back out
const READ_CHUNK_SIZE: usize = 64 * 1024;

pub struct MemoryProvider {
    default_bucket: String,
    buckets: RwLock<HashMap<String, HashMap<String, Bytes>>>,
}

impl MemoryProvider {
    pub fn new(default_bucket: impl Into<String>) -> Self {
        Self {
            default_bucket: default_bucket.into(),
            buckets: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.default_bucket.clone())
    }

    /// Number of objects stored in `bucket`
    #[cfg(test)]
    pub async fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .await
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key))
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn default_bucket(&self) -> &str {
        &self.default_bucket
    }

    async fn initialize(&self) -> Result<(), StorageError> {
        self.ensure_bucket(&self.default_bucket).await
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        mut reader: ObjectReader,
        size: u64,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let mut data = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        reader.read_to_end(&mut data).await?;

        if data.len() as u64 != size {
            return Err(StorageError::operation(format!(
                "upload '{}' declared {} bytes but stream carried {}",
                key,
                size,
                data.len()
            )));
        }

        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::NotFound(format!("bucket '{}'", bucket)))?;

        tracing::debug!(
            "Stored {} bytes at {}/{} ({})",
            data.len(),
            bucket,
            key,
            content_type
        );
        objects.insert(key.to_string(), Bytes::from(data));

        Ok(key.to_string())
    }

    async fn download_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, StorageError> {
        let buckets = self.buckets.read().await;
        let object = buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))?;

        let data = object.clone();
        let chunks: Vec<Result<Bytes, StorageError>> = (0..data.len())
            .step_by(READ_CHUNK_SIZE)
            .map(|start| {
                let end = (start + READ_CHUNK_SIZE).min(data.len());
                Ok(data.slice(start..end))
            })
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        if let Some(objects) = self.buckets.write().await.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        if !self.contains(bucket, key).await {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }

        let expires_at = Utc::now().timestamp() + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);
        Ok(format!(
            "memory://{}/{}?expires={}",
            bucket,
            urlencoding::encode(key),
            expires_at
        ))
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.buckets.read().await.contains_key(bucket))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        self.buckets
            .write()
            .await
            .entry(bucket.to_string())
            .or_default();
        Ok(())
    }
}
