use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::features::access::models::{Permission, ResourceKind};

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct AccessCheckQuery {
    /// `access` (default) or `modify`
    #[serde(default)]
    #[param(value_type = Option<String>, example = "modify")]
    pub permission: Permission,
}

/// Result of evaluating one permission
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessCheckResponseDto {
    pub resource_kind: ResourceKind,
    /// Resource id; the organization id for invite codes
    pub resource_id: Uuid,
    pub permission: Permission,
    pub allowed: bool,
}
