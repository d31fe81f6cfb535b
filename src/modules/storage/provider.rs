use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;
use tracing::info;

use super::error::StorageError;

/// Lazily-read object body. Finite and not restartable; dropping it releases
/// the underlying connection.
pub type ObjectStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Upload body handed to a provider.
pub type ObjectReader = Box<dyn AsyncRead + Send + Unpin>;

/// Contract every object storage backend implements.
///
/// Business logic only ever sees this trait; backend SDK types and error
/// semantics stay inside the implementations.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Provider name as used in configuration
    fn name(&self) -> &'static str;

    /// Bucket ensured by `initialize` and used for new uploads
    fn default_bucket(&self) -> &str;

    /// Verify connectivity and credentials and make sure the default bucket
    /// exists. Safe to call more than once.
    async fn initialize(&self) -> Result<(), StorageError>;

    /// Store an object, returning its key
    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        reader: ObjectReader,
        size: u64,
        content_type: &str,
    ) -> Result<String, StorageError>;

    /// Open an object for reading
    async fn download_object(&self, bucket: &str, key: &str) -> Result<ObjectStream, StorageError>;

    /// Delete an object. Deleting a missing key succeeds.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StorageError>;

    /// Time-limited GET URL for one object
    async fn presigned_url(
        &self,
        bucket: &str,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Create `bucket` unless it already exists
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if self.bucket_exists(bucket).await? {
            return Ok(());
        }

        self.create_bucket(bucket).await?;
        info!("Created bucket '{}' on {} provider", bucket, self.name());
        Ok(())
    }
}
