use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::core::extractor::{AppJson, AppPath, ValidatedJson};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::files::dtos::{
    BatchDeleteDto, BatchDeleteResponseDto, CleanupQuery, FileResponseDto, ListFilesQuery,
    PresignedUrlResponseDto, StorageUsageDto, SupportedTypesDto, SweepReportDto,
    UpdateVisibilityDto, UploadFileDto,
};
use crate::features::files::services::{FileService, UploadRequest};
use crate::shared::types::{ApiResponse, Meta};

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `name`: Display name (optional, defaults to the uploaded file name)
/// - `is_public`: "true" to share with the organization (optional, defaults to private)
#[utoipa::path(
    post,
    path = "/api/files",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with optional display name and visibility",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Invalid file or validation error"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "User has no organization"),
        (status = 413, description = "File too large"),
        (status = 503, description = "Storage unavailable")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn upload_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut display_name: Option<String> = None;
    let mut is_public = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let ct = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let fname = field.file_name().map(|s| s.to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;

                file_data = Some(data.to_vec());
                file_name = fname;
                content_type = Some(ct);
            }
            "name" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read name field: {}", e))
                })?;
                if !text.trim().is_empty() {
                    display_name = Some(text);
                }
            }
            "is_public" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read is_public field: {}", e))
                })?;
                is_public = matches!(text.trim().to_lowercase().as_str(), "true" | "1" | "yes");
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;
    let display_name = display_name
        .or(file_name)
        .ok_or_else(|| AppError::BadRequest("Filename is required".to_string()))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let request = UploadRequest {
        display_name,
        content_type,
        size: file_data.len() as u64,
        reader: Box::new(Cursor::new(file_data)),
        is_public,
    };

    let file = service.upload(user.user_id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(FileResponseDto::from(file)),
            Some("File uploaded successfully".to_string()),
            None,
        )),
    ))
}

/// List files uploaded by the current user
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(ListFilesQuery),
    responses(
        (status = 200, description = "Files uploaded by the caller", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "User has no organization")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>, AppError> {
    let files = service
        .list_user_files(user.user_id, query.include_deleted)
        .await?;
    let total = files.len();
    let items = files.into_iter().map(FileResponseDto::from).collect();

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta::total(total)),
    )))
}

/// List files of an organization
#[utoipa::path(
    get,
    path = "/api/files/organization/{organization_id}",
    tag = "files",
    params(
        ("organization_id" = Uuid, Path, description = "Organization ID"),
        ListFilesQuery
    ),
    responses(
        (status = 200, description = "Organization files", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not a member of the organization"),
        (status = 404, description = "Organization not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_organization_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(organization_id): AppPath<Uuid>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>, AppError> {
    let files = service
        .list_organization_files(user.user_id, organization_id, query.include_deleted)
        .await?;
    let total = files.len();
    let items = files.into_iter().map(FileResponseDto::from).collect();

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta::total(total)),
    )))
}

/// Storage used by an organization's active files
#[utoipa::path(
    get,
    path = "/api/files/organization/{organization_id}/usage",
    tag = "files",
    params(("organization_id" = Uuid, Path, description = "Organization ID")),
    responses(
        (status = 200, description = "Storage usage", body = ApiResponse<StorageUsageDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Not a member of the organization"),
        (status = 404, description = "Organization not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn organization_usage(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(organization_id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<StorageUsageDto>>, AppError> {
    let usage = service
        .organization_usage(user.user_id, organization_id)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(StorageUsageDto::new(organization_id, usage)),
        None,
        None,
    )))
}

/// Supported file categories and extensions
#[utoipa::path(
    get,
    path = "/api/files/types",
    tag = "files",
    responses(
        (status = 200, description = "Supported file types", body = ApiResponse<SupportedTypesDto>),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn supported_types(
    _user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
) -> Json<ApiResponse<SupportedTypesDto>> {
    Json(ApiResponse::success(
        Some(SupportedTypesDto {
            categories: service.supported_file_types(),
            max_upload_size: service.max_upload_size(),
        }),
        None,
        None,
    ))
}

/// Get file metadata
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.get_file(user.user_id, id).await?;

    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(file)),
        None,
        None,
    )))
}

/// Get a time-limited download URL
#[utoipa::path(
    get,
    path = "/api/files/{id}/url",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "Presigned URL", body = ApiResponse<PresignedUrlResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_presigned_url(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<PresignedUrlResponseDto>>, AppError> {
    let presigned = service.presigned_url(user.user_id, id).await?;

    Ok(Json(ApiResponse::success(
        Some(PresignedUrlResponseDto::from(presigned)),
        None,
        None,
    )))
}

/// Download the file body
#[utoipa::path(
    get,
    path = "/api/files/{id}/download",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found"),
        (status = 502, description = "Storage backend error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn download_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Response, AppError> {
    let download = service.download(user.user_id, id).await?;
    let file = &download.file;

    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let disposition = HeaderValue::from_str(&content_disposition(&file.display_name))
        .map_err(|e| AppError::Internal(format!("Invalid Content-Disposition: {}", e)))?;
    let length = HeaderValue::from(file.size_bytes.max(0) as u64);

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, disposition),
        (header::CONTENT_LENGTH, length),
    ];

    Ok((headers, Body::from_stream(download.stream)).into_response())
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name
fn content_disposition(display_name: &str) -> String {
    let fallback: String = display_name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(display_name)
    )
}

/// Soft delete a file
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File moved to trash", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the uploader can delete the file"),
        (status = 404, description = "File not found"),
        (status = 409, description = "File already deleted")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.soft_delete(user.user_id, id).await?;

    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(file)),
        Some("File deleted successfully".to_string()),
        None,
    )))
}

/// Restore a soft-deleted file
#[utoipa::path(
    post,
    path = "/api/files/{id}/restore",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 200, description = "File restored", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the uploader can restore the file"),
        (status = 404, description = "File not found"),
        (status = 409, description = "File is not deleted")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn restore_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service.restore(user.user_id, id).await?;

    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(file)),
        Some("File restored successfully".to_string()),
        None,
    )))
}

/// Permanently delete a soft-deleted file
#[utoipa::path(
    delete,
    path = "/api/files/{id}/permanent",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    responses(
        (status = 204, description = "File removed permanently"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the uploader can remove the file"),
        (status = 404, description = "File not found"),
        (status = 409, description = "File must be deleted first"),
        (status = 502, description = "Storage backend error")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn permanent_delete_file(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, AppError> {
    service.permanent_delete(user.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change who can see a file
#[utoipa::path(
    put,
    path = "/api/files/{id}/visibility",
    tag = "files",
    params(("id" = Uuid, Path, description = "File ID")),
    request_body = UpdateVisibilityDto,
    responses(
        (status = 200, description = "Visibility updated", body = ApiResponse<FileResponseDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Only the uploader can change visibility"),
        (status = 404, description = "File not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_visibility(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(dto): AppJson<UpdateVisibilityDto>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let file = service
        .update_visibility(user.user_id, id, dto.is_public)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(FileResponseDto::from(file)),
        None,
        None,
    )))
}

/// Soft delete several files
///
/// Each id is handled on its own; the response lists what was deleted and what failed.
#[utoipa::path(
    post,
    path = "/api/files/batch-delete",
    tag = "files",
    request_body = BatchDeleteDto,
    responses(
        (status = 200, description = "Per-file outcome", body = ApiResponse<BatchDeleteResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Authentication required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn batch_delete_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    ValidatedJson(dto): ValidatedJson<BatchDeleteDto>,
) -> Result<Json<ApiResponse<BatchDeleteResponseDto>>, AppError> {
    let outcome = service
        .batch_soft_delete(user.user_id, &dto.file_ids)
        .await?;
    let message = format!(
        "{} deleted, {} failed",
        outcome.deleted.len(),
        outcome.failed.len()
    );

    Ok(Json(ApiResponse::success(
        Some(BatchDeleteResponseDto::from(outcome)),
        Some(message),
        None,
    )))
}

/// Permanently remove files past the retention window (admins only)
#[utoipa::path(
    post,
    path = "/api/files/cleanup",
    tag = "files",
    params(CleanupQuery),
    responses(
        (status = 200, description = "Sweep report", body = ApiResponse<SweepReportDto>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Administrator access required")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cleanup_files(
    user: AuthenticatedUser,
    State(service): State<Arc<FileService>>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<ApiResponse<SweepReportDto>>, AppError> {
    let report = service.cleanup_expired(user.user_id, query.days).await?;

    Ok(Json(ApiResponse::success(
        Some(SweepReportDto::from(report)),
        None,
        None,
    )))
}
