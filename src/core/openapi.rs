use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::access::{dtos as access_dtos, handlers as access_handlers, models as access_models};
use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::modules::storage::FileCategory;
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Files
        files_handlers::upload_file,
        files_handlers::list_my_files,
        files_handlers::list_organization_files,
        files_handlers::organization_usage,
        files_handlers::supported_types,
        files_handlers::get_file,
        files_handlers::get_presigned_url,
        files_handlers::download_file,
        files_handlers::delete_file,
        files_handlers::restore_file,
        files_handlers::permanent_delete_file,
        files_handlers::update_visibility,
        files_handlers::batch_delete_files,
        files_handlers::cleanup_files,
        // Access
        access_handlers::check_access,
    ),
    components(
        schemas(
            // Shared
            Meta,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            ApiResponse<files_dtos::PresignedUrlResponseDto>,
            ApiResponse<files_dtos::BatchDeleteResponseDto>,
            ApiResponse<files_dtos::SweepReportDto>,
            ApiResponse<files_dtos::StorageUsageDto>,
            ApiResponse<files_dtos::SupportedTypesDto>,
            ApiResponse<access_dtos::AccessCheckResponseDto>,
            // Files
            FileCategory,
            files_models::FileState,
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            files_dtos::UpdateVisibilityDto,
            files_dtos::BatchDeleteDto,
            files_dtos::BatchDeleteResponseDto,
            files_dtos::PresignedUrlResponseDto,
            files_dtos::SweepReportDto,
            files_dtos::StorageUsageDto,
            files_dtos::SupportedTypesDto,
            // Access
            access_models::ResourceKind,
            access_models::Permission,
            access_dtos::AccessCheckResponseDto,
        )
    ),
    tags(
        (name = "files", description = "File upload, download, trash and retention"),
        (name = "access", description = "Permission checks on collaboration resources"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Pulse Files API",
        version = "0.1.0",
        description = "File storage and access control for the Pulse collaboration backend"
    )
)]
pub struct ApiDoc;

/// Adds Bearer JWT security scheme to OpenAPI spec
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct DocsInfoModifier {
    pub title: String,
    pub version: String,
}

impl Modify for DocsInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_file_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/files",
            "/api/files/{id}",
            "/api/files/{id}/download",
            "/api/files/batch-delete",
            "/api/access/{kind}/{id}",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {}",
                expected
            );
        }
    }

    #[test]
    fn test_info_modifier_overrides_title() {
        let mut doc = ApiDoc::openapi();
        DocsInfoModifier {
            title: "Staging Files".to_string(),
            version: "9.9.9".to_string(),
        }
        .modify(&mut doc);

        assert_eq!(doc.info.title, "Staging Files");
        assert_eq!(doc.info.version, "9.9.9");
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
