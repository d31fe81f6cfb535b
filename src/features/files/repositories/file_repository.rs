use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::files::models::{File, NewFile, StorageUsage};

/// Persistence for file metadata.
///
/// Every write keeps `is_deleted` and `deleted_at` in step; the state-changing
/// updates are conditional on the current state and return `None` when the
/// row was not in the expected state (or does not exist).
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, file: &NewFile) -> Result<File>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<File>>;

    /// Active → SoftDeleted
    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<Option<File>>;

    /// SoftDeleted → Active
    async fn restore(&self, id: Uuid) -> Result<Option<File>>;

    async fn update_visibility(&self, id: Uuid, is_public: bool) -> Result<Option<File>>;

    /// Remove the row. Returns whether a row was removed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn find_by_uploader(
        &self,
        uploader_id: Uuid,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>>;

    async fn find_by_organization(
        &self,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>>;

    /// Soft-deleted files with `deleted_at <= threshold`, oldest first
    async fn find_deleted_before(&self, threshold: DateTime<Utc>) -> Result<Vec<File>>;

    async fn organization_usage(&self, organization_id: Uuid) -> Result<StorageUsage>;
}

pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const FILE_COLUMNS: &str = "id, display_name, bucket, object_key, content_type, size_bytes, \
     uploader_id, organization_id, is_public, is_deleted, deleted_at, uploaded_at";

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, file: &NewFile) -> Result<File> {
        let query = format!(
            r#"
            INSERT INTO files (id, display_name, bucket, object_key, content_type, size_bytes,
                               uploader_id, organization_id, is_public)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let created = sqlx::query_as::<_, File>(&query)
            .bind(file.id)
            .bind(&file.display_name)
            .bind(&file.bucket)
            .bind(&file.object_key)
            .bind(&file.content_type)
            .bind(file.size_bytes)
            .bind(file.uploader_id)
            .bind(file.organization_id)
            .bind(file.is_public)
            .fetch_one(&self.pool)
            .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<File>> {
        let query = format!("SELECT {} FROM files WHERE id = $1", FILE_COLUMNS);

        let file = sqlx::query_as::<_, File>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    async fn soft_delete(&self, id: Uuid, deleted_at: DateTime<Utc>) -> Result<Option<File>> {
        let query = format!(
            r#"
            UPDATE files
            SET is_deleted = TRUE, deleted_at = $2
            WHERE id = $1 AND is_deleted = FALSE
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let file = sqlx::query_as::<_, File>(&query)
            .bind(id)
            .bind(deleted_at)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    async fn restore(&self, id: Uuid) -> Result<Option<File>> {
        let query = format!(
            r#"
            UPDATE files
            SET is_deleted = FALSE, deleted_at = NULL
            WHERE id = $1 AND is_deleted = TRUE
            RETURNING {}
            "#,
            FILE_COLUMNS
        );

        let file = sqlx::query_as::<_, File>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    async fn update_visibility(&self, id: Uuid, is_public: bool) -> Result<Option<File>> {
        let query = format!(
            "UPDATE files SET is_public = $2 WHERE id = $1 RETURNING {}",
            FILE_COLUMNS
        );

        let file = sqlx::query_as::<_, File>(&query)
            .bind(id)
            .bind(is_public)
            .fetch_optional(&self.pool)
            .await?;

        Ok(file)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_uploader(
        &self,
        uploader_id: Uuid,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>> {
        let query = format!(
            r#"
            SELECT {}
            FROM files
            WHERE uploader_id = $1
              AND organization_id = $2
              AND ($3 OR is_deleted = FALSE)
            ORDER BY uploaded_at DESC
            "#,
            FILE_COLUMNS
        );

        let files = sqlx::query_as::<_, File>(&query)
            .bind(uploader_id)
            .bind(organization_id)
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    async fn find_by_organization(
        &self,
        organization_id: Uuid,
        include_deleted: bool,
    ) -> Result<Vec<File>> {
        let query = format!(
            r#"
            SELECT {}
            FROM files
            WHERE organization_id = $1
              AND ($2 OR is_deleted = FALSE)
            ORDER BY uploaded_at DESC
            "#,
            FILE_COLUMNS
        );

        let files = sqlx::query_as::<_, File>(&query)
            .bind(organization_id)
            .bind(include_deleted)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    async fn find_deleted_before(&self, threshold: DateTime<Utc>) -> Result<Vec<File>> {
        let query = format!(
            r#"
            SELECT {}
            FROM files
            WHERE is_deleted = TRUE AND deleted_at <= $1
            ORDER BY deleted_at ASC
            "#,
            FILE_COLUMNS
        );

        let files = sqlx::query_as::<_, File>(&query)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(files)
    }

    async fn organization_usage(&self, organization_id: Uuid) -> Result<StorageUsage> {
        let usage = sqlx::query_as::<_, StorageUsage>(
            r#"
            SELECT COUNT(*)::BIGINT AS file_count,
                   COALESCE(SUM(size_bytes), 0)::BIGINT AS total_bytes
            FROM files
            WHERE organization_id = $1 AND is_deleted = FALSE
            "#,
        )
        .bind(organization_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(usage)
    }
}
