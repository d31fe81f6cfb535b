use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::access::dtos::{AccessCheckQuery, AccessCheckResponseDto};
use crate::features::access::models::{ResourceKind, ResourceRef};
use crate::features::access::services::AuthorizationService;
use crate::shared::types::ApiResponse;

/// Check whether the current user holds a permission on a resource
///
/// For `invite_code` the id is the organization the code would belong to.
#[utoipa::path(
    get,
    path = "/api/access/{kind}/{id}",
    tag = "access",
    params(
        ("kind" = ResourceKind, Path, description = "file, project, event or invite_code"),
        ("id" = Uuid, Path, description = "Resource ID"),
        AccessCheckQuery
    ),
    responses(
        (status = 200, description = "Permission evaluated", body = ApiResponse<AccessCheckResponseDto>),
        (status = 400, description = "Unknown resource kind or malformed id"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "User or resource not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn check_access(
    user: AuthenticatedUser,
    State(service): State<Arc<AuthorizationService>>,
    Path((kind, id)): Path<(String, String)>,
    Query(query): Query<AccessCheckQuery>,
) -> Result<Json<ApiResponse<AccessCheckResponseDto>>, AppError> {
    let kind: ResourceKind = kind.parse().map_err(AppError::Validation)?;
    let resource_id = Uuid::parse_str(&id)
        .map_err(|_| AppError::Validation(format!("'{}' is not a valid id", id)))?;

    let allowed = service
        .authorize(
            user.user_id,
            ResourceRef::new(kind, resource_id),
            query.permission,
        )
        .await?;

    Ok(Json(ApiResponse::success(
        Some(AccessCheckResponseDto {
            resource_kind: kind,
            resource_id,
            permission: query.permission,
            allowed,
        }),
        None,
        None,
    )))
}
