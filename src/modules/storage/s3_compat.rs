//! Shared client for S3-compatible backends.
//!
//! Both the self-hosted (MinIO) and the cloud (AWS S3) providers speak the S3
//! object API; they only differ in how the region/endpoint is built and in
//! addressing style. This module holds the operations once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures::StreamExt;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};
use tracing::debug;

use super::error::StorageError;
use super::provider::{ObjectReader, ObjectStream};

/// S3 addressing style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingStyle {
    /// `http://endpoint/bucket/key`
    Path,
    /// `http://bucket.endpoint/key`
    VirtualHost,
}

pub struct S3CompatClient {
    region: Region,
    credentials: Credentials,
    style: AddressingStyle,
    /// Bucket handles keyed by name; building one is cheap but not free
    buckets: RwLock<HashMap<String, Arc<Bucket>>>,
}

impl S3CompatClient {
    pub fn new(
        region: Region,
        access_key: &str,
        secret_key: &str,
        style: AddressingStyle,
    ) -> Result<Self, StorageError> {
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StorageError::configuration(format!("Invalid credentials: {}", e)))?;

        Ok(Self {
            region,
            credentials,
            style,
            buckets: RwLock::new(HashMap::new()),
        })
    }

    fn bucket(&self, name: &str) -> Result<Arc<Bucket>, StorageError> {
        if let Some(bucket) = self
            .buckets
            .read()
            .map_err(|_| StorageError::operation("bucket cache poisoned"))?
            .get(name)
        {
            return Ok(Arc::clone(bucket));
        }

        let mut bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())?;
        if self.style == AddressingStyle::Path {
            bucket.set_path_style();
        }
        let bucket: Arc<Bucket> = Arc::from(bucket);

        self.buckets
            .write()
            .map_err(|_| StorageError::operation("bucket cache poisoned"))?
            .insert(name.to_string(), Arc::clone(&bucket));

        Ok(bucket)
    }

    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        mut reader: ObjectReader,
        size: u64,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let handle = self.bucket(bucket)?;

        let response = handle
            .put_object_stream_with_content_type(&mut reader, key, content_type)
            .await?;
        check_status(response.status_code(), || format!("upload '{}'", key))?;

        debug!("Uploaded '{}' ({} bytes) to bucket '{}'", key, size, bucket);
        Ok(key.to_string())
    }

    pub async fn download(&self, bucket: &str, key: &str) -> Result<ObjectStream, StorageError> {
        let handle = self.bucket(bucket)?;

        let response = handle.get_object_stream(key).await?;
        if response.status_code == 404 {
            return Err(StorageError::NotFound(format!("{}/{}", bucket, key)));
        }
        check_status(response.status_code, || format!("download '{}'", key))?;

        debug!("Opened '{}' from bucket '{}' for reading", key, bucket);
        let stream = response
            .bytes
            .map(|chunk| chunk.map_err(StorageError::from));
        Ok(Box::pin(stream))
    }

    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let handle = self.bucket(bucket)?;

        match handle.delete_object(key).await {
            Ok(response) => {
                let status = response.status_code();
                if status != 404 {
                    check_status(status, || format!("delete '{}'", key))?;
                }
            }
            Err(e) => {
                let err = StorageError::from(e);
                if !err.is_not_found() {
                    return Err(err);
                }
            }
        }

        debug!("Deleted '{}' from bucket '{}'", key, bucket);
        Ok(())
    }

    pub async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let handle = self.bucket(bucket)?;
        let expiry_secs = u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX);

        let url = handle.presign_get(key, expiry_secs, None).await?;
        Ok(url)
    }

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        let handle = self.bucket(bucket)?;
        Ok(handle.exists().await?)
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let config = BucketConfiguration::default();

        let response = match self.style {
            AddressingStyle::Path => {
                Bucket::create_with_path_style(
                    bucket,
                    self.region.clone(),
                    self.credentials.clone(),
                    config,
                )
                .await?
            }
            AddressingStyle::VirtualHost => {
                Bucket::create(bucket, self.region.clone(), self.credentials.clone(), config)
                    .await?
            }
        };

        if !response.success() {
            return Err(StorageError::operation(format!(
                "Failed to create bucket '{}': {} - {}",
                bucket, response.response_code, response.response_text
            )));
        }

        Ok(())
    }
}

fn check_status(status: u16, action: impl FnOnce() -> String) -> Result<(), StorageError> {
    match status {
        200..=299 => Ok(()),
        404 => Err(StorageError::NotFound(action())),
        401 | 403 => Err(StorageError::configuration(format!(
            "{} rejected with status {}",
            action(),
            status
        ))),
        _ => Err(StorageError::operation(format!(
            "{} failed with status {}",
            action(),
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status(200, || "op".to_string()).is_ok());
        assert!(check_status(204, || "op".to_string()).is_ok());
        assert!(check_status(404, || "op".to_string()).unwrap_err().is_not_found());
        assert!(matches!(
            check_status(403, || "op".to_string()),
            Err(StorageError::Configuration(_))
        ));
        assert!(matches!(
            check_status(500, || "op".to_string()),
            Err(StorageError::Operation(_))
        ));
    }
}
