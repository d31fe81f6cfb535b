use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    batch_delete_files, cleanup_files, delete_file, download_file, get_file, get_presigned_url,
    list_my_files, list_organization_files, organization_usage, permanent_delete_file,
    restore_file, supported_types, update_visibility, upload_file,
};
use crate::features::files::services::FileService;

/// Headroom on top of the upload limit for multipart framing
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>) -> Router {
    let body_limit = file_service.max_upload_size() + MULTIPART_OVERHEAD;

    Router::new()
        .route(
            "/api/files",
            post(upload_file)
                .layer(DefaultBodyLimit::max(body_limit))
                .get(list_my_files),
        )
        .route("/api/files/types", get(supported_types))
        .route("/api/files/batch-delete", post(batch_delete_files))
        .route("/api/files/cleanup", post(cleanup_files))
        .route(
            "/api/files/organization/{organization_id}",
            get(list_organization_files),
        )
        .route(
            "/api/files/organization/{organization_id}/usage",
            get(organization_usage),
        )
        .route("/api/files/{id}", get(get_file).delete(delete_file))
        .route("/api/files/{id}/url", get(get_presigned_url))
        .route("/api/files/{id}/download", get(download_file))
        .route("/api/files/{id}/restore", post(restore_file))
        .route("/api/files/{id}/permanent", delete(permanent_delete_file))
        .route("/api/files/{id}/visibility", put(update_visibility))
        .with_state(file_service)
}
