use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::files::models::{File, FileState, StorageUsage};
use crate::features::files::services::{BatchDeleteOutcome, PresignedUrl, SweepReport};
use crate::modules::storage::FileCategory;

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for the OpenAPI document only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Display name; defaults to the uploaded file name
    #[schema(example = "quarterly-report.pdf")]
    pub name: Option<String>,
    /// "true" to make the file visible to the whole organization
    #[schema(example = "false")]
    pub is_public: Option<String>,
}

/// File metadata as returned by the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    pub id: Uuid,
    pub display_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    /// Derived from the storage key
    pub category: FileCategory,
    pub is_public: bool,
    pub state: FileState,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
    pub uploader_id: Uuid,
    pub organization_id: Uuid,
}

impl From<File> for FileResponseDto {
    fn from(file: File) -> Self {
        Self {
            category: file.category(),
            state: file.state(),
            id: file.id,
            display_name: file.display_name,
            content_type: file.content_type,
            size_bytes: file.size_bytes,
            is_public: file.is_public,
            is_deleted: file.is_deleted,
            deleted_at: file.deleted_at,
            uploaded_at: file.uploaded_at,
            uploader_id: file.uploader_id,
            organization_id: file.organization_id,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListFilesQuery {
    /// Include soft-deleted files uploaded by the caller
    #[serde(default)]
    pub include_deleted: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVisibilityDto {
    pub is_public: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchDeleteDto {
    /// File ids to soft delete
    #[validate(length(min = 1, max = 500, message = "file_ids must contain 1 to 500 ids"))]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BatchDeleteResponseDto {
    pub deleted: Vec<Uuid>,
    /// Ids that were rejected, exactly as submitted
    pub failed: Vec<String>,
}

impl From<BatchDeleteOutcome> for BatchDeleteResponseDto {
    fn from(outcome: BatchDeleteOutcome) -> Self {
        Self {
            deleted: outcome.deleted,
            failed: outcome.failed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PresignedUrlResponseDto {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

impl From<PresignedUrl> for PresignedUrlResponseDto {
    fn from(presigned: PresignedUrl) -> Self {
        Self {
            url: presigned.url,
            expires_at: presigned.expires_at,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct CleanupQuery {
    /// Retention period in days; non-positive or missing uses the configured default
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SweepReportDto {
    pub threshold: DateTime<Utc>,
    pub examined: usize,
    pub purged: usize,
    pub failed: Vec<Uuid>,
}

impl From<SweepReport> for SweepReportDto {
    fn from(report: SweepReport) -> Self {
        Self {
            threshold: report.threshold,
            examined: report.examined,
            purged: report.purged,
            failed: report.failed,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StorageUsageDto {
    pub organization_id: Uuid,
    pub file_count: i64,
    pub total_bytes: i64,
}

impl StorageUsageDto {
    pub fn new(organization_id: Uuid, usage: StorageUsage) -> Self {
        Self {
            organization_id,
            file_count: usage.file_count,
            total_bytes: usage.total_bytes,
        }
    }
}

/// Known extensions per category, plus the upload limit
#[derive(Debug, Serialize, ToSchema)]
pub struct SupportedTypesDto {
    pub categories: BTreeMap<FileCategory, Vec<String>>,
    pub max_upload_size: usize,
}
