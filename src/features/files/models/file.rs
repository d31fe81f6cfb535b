use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::modules::storage::FileCategory;

/// Database model for files
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct File {
    pub id: Uuid,
    pub display_name: String,
    pub bucket: String,
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploader_id: Uuid,
    pub organization_id: Uuid,
    pub is_public: bool,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
}

/// Lifecycle state derived from the deletion flag.
///
/// Permanently deleted files have no row, so there is no variant for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Active,
    SoftDeleted,
}

impl File {
    pub fn state(&self) -> FileState {
        if self.is_deleted {
            FileState::SoftDeleted
        } else {
            FileState::Active
        }
    }

    /// Category is never stored; the key carries it
    pub fn category(&self) -> FileCategory {
        FileCategory::from_object_key(&self.object_key)
            .unwrap_or_else(|| FileCategory::from_filename(&self.display_name))
    }
}

/// Values written when a file row is created
#[derive(Debug, Clone)]
pub struct NewFile {
    pub id: Uuid,
    pub display_name: String,
    pub bucket: String,
    pub object_key: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub uploader_id: Uuid,
    pub organization_id: Uuid,
    pub is_public: bool,
}

/// Aggregate of an organization's active files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromRow, Serialize, ToSchema)]
pub struct StorageUsage {
    pub file_count: i64,
    pub total_bytes: i64,
}
