use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Resource families guarded by the authorization service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    File,
    Project,
    Event,
    InviteCode,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::File => "file",
            ResourceKind::Project => "project",
            ResourceKind::Event => "event",
            ResourceKind::InviteCode => "invite_code",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ResourceKind::File),
            "project" => Ok(ResourceKind::Project),
            "event" => Ok(ResourceKind::Event),
            "invite_code" => Ok(ResourceKind::InviteCode),
            other => Err(format!("Unknown resource kind '{}'", other)),
        }
    }
}

/// A concrete resource to authorize against.
///
/// Invite codes are scoped to an organization, so their reference carries the
/// organization id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    File(Uuid),
    Project(Uuid),
    Event(Uuid),
    InviteCode { organization_id: Uuid },
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: Uuid) -> Self {
        match kind {
            ResourceKind::File => ResourceRef::File(id),
            ResourceKind::Project => ResourceRef::Project(id),
            ResourceKind::Event => ResourceRef::Event(id),
            ResourceKind::InviteCode => ResourceRef::InviteCode {
                organization_id: id,
            },
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::File(_) => ResourceKind::File,
            ResourceRef::Project(_) => ResourceKind::Project,
            ResourceRef::Event(_) => ResourceKind::Event,
            ResourceRef::InviteCode { .. } => ResourceKind::InviteCode,
        }
    }
}

/// Coarse read access or narrower modify rights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    #[default]
    Access,
    Modify,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip_through_str() {
        for kind in [
            ResourceKind::File,
            ResourceKind::Project,
            ResourceKind::Event,
            ResourceKind::InviteCode,
        ] {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
            assert_eq!(ResourceRef::new(kind, Uuid::nil()).kind(), kind);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!("folder".parse::<ResourceKind>().is_err());
        assert!("File".parse::<ResourceKind>().is_err());
    }
}
