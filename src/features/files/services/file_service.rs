use chrono::{DateTime, Utc};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::config::{FilesConfig, RetentionConfig};
use crate::core::error::{AppError, Result};
use crate::features::access::services::AuthorizationService;
use crate::features::files::models::{File, NewFile, StorageUsage};
use crate::features::files::repositories::FileRepository;
use crate::modules::storage::naming::{generate_object_key, supported_file_types};
use crate::modules::storage::{FileCategory, ObjectReader, ObjectStream, StorageError, StorageProvider};
use crate::shared::validation::{validate_content_type, validate_display_name};

/// Pause before retrying a failed step of a permanent delete
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Whether the storage backend came up at startup
#[derive(Clone)]
pub enum StorageState {
    Ready(Arc<dyn StorageProvider>),
    /// Initialization failed; the file subsystem refuses all work
    Unavailable(String),
}

impl StorageState {
    /// Initialize the provider, degrading to `Unavailable` when it fails
    pub async fn connect(provider: Arc<dyn StorageProvider>) -> Self {
        match provider.initialize().await {
            Ok(()) => {
                info!(
                    "Storage provider '{}' ready (bucket: {})",
                    provider.name(),
                    provider.default_bucket()
                );
                StorageState::Ready(provider)
            }
            Err(e) => {
                warn!(
                    "Storage provider '{}' failed to initialize, file operations disabled: {}",
                    provider.name(),
                    e
                );
                StorageState::Unavailable(format!(
                    "{} storage failed to initialize: {}",
                    provider.name(),
                    e
                ))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, StorageState::Ready(_))
    }
}

/// A file body to store
pub struct UploadRequest {
    pub display_name: String,
    pub content_type: String,
    pub size: u64,
    pub reader: ObjectReader,
    pub is_public: bool,
}

/// An opened download together with the metadata needed to serve it
pub struct FileDownload {
    pub file: File,
    pub stream: ObjectStream,
}

#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Per-item result of a batch soft delete
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchDeleteOutcome {
    pub deleted: Vec<Uuid>,
    /// Ids (as given) that could not be parsed, authorized or deleted
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub threshold: DateTime<Utc>,
    pub examined: usize,
    pub purged: usize,
    pub failed: Vec<Uuid>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Service for the file lifecycle: upload, access, soft delete, restore and
/// permanent removal
pub struct FileService {
    files: Arc<dyn FileRepository>,
    authz: Arc<AuthorizationService>,
    storage: StorageState,
    config: FilesConfig,
    default_retention: chrono::Duration,
}

impl FileService {
    pub fn new(
        files: Arc<dyn FileRepository>,
        authz: Arc<AuthorizationService>,
        storage: StorageState,
        config: FilesConfig,
        default_retention: chrono::Duration,
    ) -> Self {
        Self {
            files,
            authz,
            storage,
            config,
            default_retention,
        }
    }

    pub fn max_upload_size(&self) -> usize {
        self.config.max_upload_size
    }

    pub fn default_retention(&self) -> chrono::Duration {
        self.default_retention
    }

    fn provider(&self) -> Result<&Arc<dyn StorageProvider>> {
        match &self.storage {
            StorageState::Ready(provider) => Ok(provider),
            StorageState::Unavailable(reason) => {
                Err(AppError::StorageUnavailable(reason.clone()))
            }
        }
    }

    async fn load(&self, file_id: Uuid) -> Result<File> {
        self.files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))
    }

    /// Load a file for reading; deleted files are reported as missing
    async fn load_accessible(&self, user_id: Uuid, file_id: Uuid) -> Result<File> {
        let file = self.load(file_id).await?;

        if file.is_deleted {
            return Err(AppError::NotFound(format!(
                "File {} has been deleted",
                file_id
            )));
        }

        self.authz.ensure_file_access(user_id, &file).await?;
        Ok(file)
    }

    /// Run a storage call under the transfer deadline
    async fn with_deadline<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, StorageError>>,
    {
        let limit = self.config.transfer_timeout;
        match tokio::time::timeout(limit, operation).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(StorageError::Timeout(limit.as_secs()).into()),
        }
    }

    // =========================================================================
    // Upload
    // =========================================================================

    /// Store a new file in the caller's organization.
    ///
    /// The object is written first, then the metadata row. If the row cannot
    /// be written the object is deleted again; a failed cleanup is logged and
    /// the original error is returned.
    pub async fn upload(&self, user_id: Uuid, request: UploadRequest) -> Result<File> {
        let storage = self.provider()?;

        let display_name =
            validate_display_name(&request.display_name).map_err(AppError::Validation)?;
        let content_type =
            validate_content_type(&request.content_type).map_err(AppError::Validation)?;
        if request.size > self.config.max_upload_size as u64 {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                self.config.max_upload_size,
                self.config.max_upload_size / 1024 / 1024
            )));
        }
        let size_bytes = i64::try_from(request.size)
            .map_err(|_| AppError::Validation("File size out of range".to_string()))?;

        let organization_id = self
            .authz
            .user_organization_id(user_id)
            .await?
            .ok_or_else(|| {
                AppError::AccessDenied("User does not belong to an organization".to_string())
            })?;

        let bucket = storage.default_bucket().to_string();
        let object_key = generate_object_key(organization_id, &display_name);

        self.with_deadline(storage.upload_object(
            &bucket,
            &object_key,
            request.reader,
            request.size,
            &content_type,
        ))
        .await?;

        debug!("Object stored: bucket={}, key={}", bucket, object_key);

        let new_file = NewFile {
            id: Uuid::new_v4(),
            display_name,
            bucket: bucket.clone(),
            object_key: object_key.clone(),
            content_type,
            size_bytes,
            uploader_id: user_id,
            organization_id,
            is_public: request.is_public,
        };

        let file = match self.files.create(&new_file).await {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    "Saving metadata for {} failed, removing uploaded object: {}",
                    object_key, e
                );
                if let Err(cleanup) = storage.delete_object(&bucket, &object_key).await {
                    error!(
                        "Failed to remove orphaned object {}/{}: {}",
                        bucket, object_key, cleanup
                    );
                }
                return Err(e);
            }
        };

        info!(
            "File uploaded: id={}, key={}, size={}, org={}",
            file.id, file.object_key, file.size_bytes, file.organization_id
        );

        Ok(file)
    }

    // =========================================================================
    // Read access
    // =========================================================================

    /// File metadata. A deleted file is only visible to its uploader.
    pub async fn get_file(&self, user_id: Uuid, file_id: Uuid) -> Result<File> {
        self.provider()?;
        let file = self.load(file_id).await?;

        if file.is_deleted {
            if file.uploader_id == user_id {
                return Ok(file);
            }
            return Err(AppError::NotFound(format!("File {} not found", file_id)));
        }

        self.authz.ensure_file_access(user_id, &file).await?;
        Ok(file)
    }

    pub async fn presigned_url(&self, user_id: Uuid, file_id: Uuid) -> Result<PresignedUrl> {
        let storage = self.provider()?;
        let file = self.load_accessible(user_id, file_id).await?;

        let ttl = self.config.presigned_url_ttl;
        let url = storage
            .presigned_url(&file.bucket, &file.object_key, ttl)
            .await?;

        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1));

        debug!("Presigned URL issued for file {} to user {}", file.id, user_id);
        Ok(PresignedUrl { url, expires_at })
    }

    /// Open the file body. The stream is bounded by the transfer deadline.
    pub async fn download(&self, user_id: Uuid, file_id: Uuid) -> Result<FileDownload> {
        let storage = self.provider()?;
        let file = self.load_accessible(user_id, file_id).await?;

        let deadline = Instant::now() + self.config.transfer_timeout;
        let stream = self
            .with_deadline(storage.download_object(&file.bucket, &file.object_key))
            .await?;

        debug!("Download opened for file {} by user {}", file.id, user_id);

        Ok(FileDownload {
            file,
            stream: stream_until(stream, deadline, self.config.transfer_timeout.as_secs()),
        })
    }

    /// Files uploaded by the caller in their organization, newest first
    pub async fn list_user_files(&self, user_id: Uuid, include_deleted: bool) -> Result<Vec<File>> {
        self.provider()?;

        let organization_id = self
            .authz
            .user_organization_id(user_id)
            .await?
            .ok_or_else(|| {
                AppError::AccessDenied("User does not belong to an organization".to_string())
            })?;

        self.files
            .find_by_uploader(user_id, organization_id, include_deleted)
            .await
    }

    /// Files of an organization. Deleted files are only listed for their uploader.
    pub async fn list_organization_files(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>> {
        self.provider()?;
        self.authz
            .validate_user_access(user_id, organization_id)
            .await?;

        let files = self
            .files
            .find_by_organization(organization_id, include_deleted)
            .await?;

        Ok(files
            .into_iter()
            .filter(|file| !file.is_deleted || file.uploader_id == user_id)
            .collect())
    }

    pub async fn organization_usage(
        &self,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<StorageUsage> {
        self.provider()?;
        self.authz
            .validate_user_access(user_id, organization_id)
            .await?;

        self.files.organization_usage(organization_id).await
    }

    pub fn supported_file_types(&self) -> BTreeMap<FileCategory, Vec<String>> {
        supported_file_types()
    }

    // =========================================================================
    // State transitions
    // =========================================================================

    pub async fn soft_delete(&self, user_id: Uuid, file_id: Uuid) -> Result<File> {
        self.provider()?;
        let file = self.load(file_id).await?;
        self.authz.ensure_file_modify(user_id, &file).await?;

        if file.is_deleted {
            return Err(AppError::AlreadyDeleted(format!(
                "File {} is already deleted",
                file_id
            )));
        }

        let deleted = self
            .files
            .soft_delete(file_id, Utc::now())
            .await?
            .ok_or_else(|| {
                AppError::AlreadyDeleted(format!("File {} is already deleted", file_id))
            })?;

        info!("File soft-deleted: id={}, by={}", file_id, user_id);
        Ok(deleted)
    }

    pub async fn restore(&self, user_id: Uuid, file_id: Uuid) -> Result<File> {
        self.provider()?;
        let file = self.load(file_id).await?;
        self.authz.ensure_file_modify(user_id, &file).await?;

        if !file.is_deleted {
            return Err(AppError::NotDeleted(format!(
                "File {} is not deleted",
                file_id
            )));
        }

        let restored = self
            .files
            .restore(file_id)
            .await?
            .ok_or_else(|| AppError::NotDeleted(format!("File {} is not deleted", file_id)))?;

        info!("File restored: id={}, by={}", file_id, user_id);
        Ok(restored)
    }

    pub async fn update_visibility(
        &self,
        user_id: Uuid,
        file_id: Uuid,
        is_public: bool,
    ) -> Result<File> {
        self.provider()?;
        let file = self.load(file_id).await?;
        self.authz.ensure_file_modify(user_id, &file).await?;

        let updated = self
            .files
            .update_visibility(file_id, is_public)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;

        info!(
            "File visibility changed: id={}, is_public={}",
            file_id, is_public
        );
        Ok(updated)
    }

    /// Soft delete every id independently. Failures are collected, never fatal.
    pub async fn batch_soft_delete(
        &self,
        user_id: Uuid,
        file_ids: &[String],
    ) -> Result<BatchDeleteOutcome> {
        self.provider()?;
        let mut outcome = BatchDeleteOutcome::default();

        for raw_id in file_ids {
            let file_id = match Uuid::parse_str(raw_id.trim()) {
                Ok(id) => id,
                Err(_) => {
                    debug!("Batch delete: '{}' is not a valid file id", raw_id);
                    outcome.failed.push(raw_id.clone());
                    continue;
                }
            };

            match self.soft_delete(user_id, file_id).await {
                Ok(_) => outcome.deleted.push(file_id),
                Err(e) => {
                    debug!("Batch delete: file {} failed: {}", file_id, e);
                    outcome.failed.push(raw_id.clone());
                }
            }
        }

        info!(
            "Batch soft delete by {}: {} deleted, {} failed",
            user_id,
            outcome.deleted.len(),
            outcome.failed.len()
        );
        Ok(outcome)
    }

    /// Permanently remove a soft-deleted file on behalf of its uploader
    pub async fn permanent_delete(&self, user_id: Uuid, file_id: Uuid) -> Result<()> {
        let storage = self.provider()?;
        let file = self.load(file_id).await?;
        self.authz.ensure_file_modify(user_id, &file).await?;

        if !file.is_deleted {
            return Err(AppError::NotDeleted(format!(
                "File {} must be deleted before it can be removed permanently",
                file_id
            )));
        }

        self.purge(storage.as_ref(), &file).await?;
        info!("File permanently deleted: id={}, by={}", file_id, user_id);
        Ok(())
    }

    /// Delete the object, then the row, retrying each step.
    ///
    /// Not atomic: if the row delete keeps failing the object is already gone
    /// and a later retry picks up where this one stopped.
    async fn purge(&self, storage: &dyn StorageProvider, file: &File) -> Result<()> {
        let attempts = self.config.delete_max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match storage.delete_object(&file.bucket, &file.object_key).await {
                Ok(()) => break,
                Err(e) if attempt < attempts => {
                    warn!(
                        "Deleting object {}/{} failed (attempt {}/{}): {}",
                        file.bucket, file.object_key, attempt, attempts, e
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut attempt = 1;
        loop {
            match self.files.delete(file.id).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < attempts => {
                    warn!(
                        "Deleting metadata for file {} failed (attempt {}/{}): {}",
                        file.id, attempt, attempts, e
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // =========================================================================
    // Retention
    // =========================================================================

    /// Permanently delete every file soft-deleted at or before `threshold`.
    ///
    /// A failure on one file is logged and the sweep moves on.
    pub async fn run_retention_sweep(&self, threshold: DateTime<Utc>) -> Result<SweepReport> {
        let storage = self.provider()?;
        let expired = self.files.find_deleted_before(threshold).await?;

        let mut report = SweepReport {
            threshold,
            examined: expired.len(),
            purged: 0,
            failed: Vec::new(),
        };

        for file in &expired {
            match self.purge(storage.as_ref(), file).await {
                Ok(()) => {
                    debug!("Retention sweep removed file {}", file.id);
                    report.purged += 1;
                }
                Err(e) => {
                    error!("Retention sweep failed for file {}: {}", file.id, e);
                    report.failed.push(file.id);
                }
            }
        }

        info!(
            "Retention sweep (threshold {}): {} examined, {} purged, {} failed",
            threshold,
            report.examined,
            report.purged,
            report.failed.len()
        );
        Ok(report)
    }

    /// Admin-triggered sweep. `days` overrides the retention period when positive.
    pub async fn cleanup_expired(&self, user_id: Uuid, days: Option<i64>) -> Result<SweepReport> {
        self.provider()?;

        if !self.authz.is_user_admin(user_id).await? {
            return Err(AppError::AccessDenied(
                "Only administrators can run file cleanup".to_string(),
            ));
        }

        let retention = match days {
            Some(days) if days > RetentionConfig::MAX_RETENTION_DAYS => {
                return Err(AppError::Validation(format!(
                    "Retention period must be at most {} days",
                    RetentionConfig::MAX_RETENTION_DAYS
                )));
            }
            Some(days) if days > 0 => chrono::TimeDelta::try_days(days).ok_or_else(|| {
                AppError::Validation("Retention period out of range".to_string())
            })?,
            _ => self.default_retention,
        };
        let threshold = Utc::now()
            .checked_sub_signed(retention)
            .ok_or_else(|| AppError::Validation("Retention period out of range".to_string()))?;

        info!(
            "Manual cleanup requested by {} (retention {} days)",
            user_id,
            retention.num_days()
        );
        self.run_retention_sweep(threshold).await
    }
}

/// End the stream with a timeout error once `deadline` passes
fn stream_until(stream: ObjectStream, deadline: Instant, limit_secs: u64) -> ObjectStream {
    Box::pin(futures::stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => Some((Err(StorageError::Timeout(limit_secs)), None)),
        }
    }))
}
