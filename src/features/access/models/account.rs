use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Organization-level role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    User,
}

impl From<String> for Role {
    /// Anything other than the exact admin role string is a plain user
    fn from(value: String) -> Self {
        match value.as_str() {
            "Admin" => Role::Admin,
            _ => Role::User,
        }
    }
}

/// The slice of a user record needed for access decisions
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub organization_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub role: Role,
}

impl UserAccount {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn belongs_to(&self, organization_id: Uuid) -> bool {
        self.organization_id == Some(organization_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ProjectAccess {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub owner_id: Uuid,
    pub participant_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EventAccess {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub creator_id: Uuid,
    pub participant_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_from_db_value() {
        assert_eq!(Role::from("Admin".to_string()), Role::Admin);
        assert_eq!(Role::from("User".to_string()), Role::User);
        // Role strings are case sensitive
        assert_eq!(Role::from("admin".to_string()), Role::User);
        assert_eq!(Role::from(String::new()), Role::User);
    }

    #[test]
    fn test_belongs_to() {
        let org = Uuid::new_v4();
        let user = UserAccount {
            id: Uuid::new_v4(),
            organization_id: Some(org),
            role: Role::User,
        };
        assert!(user.belongs_to(org));
        assert!(!user.belongs_to(Uuid::new_v4()));

        let orphan = UserAccount {
            organization_id: None,
            ..user
        };
        assert!(!orphan.belongs_to(org));
    }
}
