use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::access::models::{
    EventAccess, Permission, ProjectAccess, ResourceRef, UserAccount,
};
use crate::features::access::repositories::{
    EventRepository, OrganizationRepository, ProjectRepository, UserRepository,
};
use crate::features::files::models::File;
use crate::features::files::repositories::FileRepository;

/// Central access policy for files, projects, events and invite codes.
///
/// Stateless: every check resolves the acting user and the target resource
/// through the repositories. A missing user or resource is `NotFound`, never
/// an implicit allow.
pub struct AuthorizationService {
    users: Arc<dyn UserRepository>,
    organizations: Arc<dyn OrganizationRepository>,
    projects: Arc<dyn ProjectRepository>,
    events: Arc<dyn EventRepository>,
    files: Arc<dyn FileRepository>,
}

impl AuthorizationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        organizations: Arc<dyn OrganizationRepository>,
        projects: Arc<dyn ProjectRepository>,
        events: Arc<dyn EventRepository>,
        files: Arc<dyn FileRepository>,
    ) -> Self {
        Self {
            users,
            organizations,
            projects,
            events,
            files,
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserAccount> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_file(&self, file_id: Uuid) -> Result<File> {
        self.files
            .find_by_id(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))
    }

    async fn get_project(&self, project_id: Uuid) -> Result<ProjectAccess> {
        self.projects
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Project {} not found", project_id)))
    }

    async fn get_event(&self, event_id: Uuid) -> Result<EventAccess> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Event {} not found", event_id)))
    }

    async fn ensure_organization_exists(&self, organization_id: Uuid) -> Result<()> {
        self.organizations
            .find_by_id(organization_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!("Organization {} not found", organization_id))
            })
    }

    // =========================================================================
    // Organization membership
    // =========================================================================

    pub async fn is_user_in_organization(&self, user_id: Uuid, organization_id: Uuid) -> Result<bool> {
        let user = self.get_user(user_id).await?;
        Ok(user.belongs_to(organization_id))
    }

    pub async fn is_user_admin(&self, user_id: Uuid) -> Result<bool> {
        let user = self.get_user(user_id).await?;
        Ok(user.is_admin())
    }

    pub async fn user_organization_id(&self, user_id: Uuid) -> Result<Option<Uuid>> {
        let user = self.get_user(user_id).await?;
        Ok(user.organization_id)
    }

    /// Admin of the given organization
    pub async fn can_manage_organization(&self, user_id: Uuid, organization_id: Uuid) -> Result<bool> {
        self.ensure_organization_exists(organization_id).await?;
        let user = self.get_user(user_id).await?;
        Ok(user.belongs_to(organization_id) && user.is_admin())
    }

    /// Invite codes may only be issued by an admin of the organization
    pub async fn can_create_invite_code(&self, user_id: Uuid, organization_id: Uuid) -> Result<bool> {
        self.can_manage_organization(user_id, organization_id).await
    }

    /// Fails with `AccessDenied` unless the user is a member of the organization
    pub async fn validate_user_access(&self, user_id: Uuid, organization_id: Uuid) -> Result<()> {
        self.ensure_organization_exists(organization_id).await?;

        if !self.is_user_in_organization(user_id, organization_id).await? {
            debug!(
                "User {} denied access to organization {}",
                user_id, organization_id
            );
            return Err(AppError::AccessDenied(
                "User is not a member of the organization".to_string(),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Files
    // =========================================================================

    pub async fn can_access_file(&self, user_id: Uuid, file_id: Uuid) -> Result<bool> {
        let file = self.get_file(file_id).await?;
        let user = self.get_user(user_id).await?;
        Ok(file_access_allowed(&user, &file))
    }

    pub async fn can_modify_file(&self, user_id: Uuid, file_id: Uuid) -> Result<bool> {
        let file = self.get_file(file_id).await?;
        let user = self.get_user(user_id).await?;
        Ok(file_modify_allowed(&user, &file))
    }

    /// Access check for a file the caller already loaded
    pub async fn ensure_file_access(&self, user_id: Uuid, file: &File) -> Result<()> {
        let user = self.get_user(user_id).await?;

        if !file_access_allowed(&user, file) {
            debug!("User {} denied access to file {}", user_id, file.id);
            return Err(AppError::AccessDenied(
                "You do not have access to this file".to_string(),
            ));
        }

        Ok(())
    }

    /// Modify check for a file the caller already loaded
    pub async fn ensure_file_modify(&self, user_id: Uuid, file: &File) -> Result<()> {
        let user = self.get_user(user_id).await?;

        if !file_modify_allowed(&user, file) {
            debug!("User {} denied modification of file {}", user_id, file.id);
            return Err(AppError::AccessDenied(
                "Only the uploader can modify this file".to_string(),
            ));
        }

        Ok(())
    }

    // =========================================================================
    // Projects and events
    // =========================================================================

    pub async fn can_access_project(&self, user_id: Uuid, project_id: Uuid) -> Result<bool> {
        let project = self.get_project(project_id).await?;
        let user = self.get_user(user_id).await?;

        Ok(user.belongs_to(project.organization_id)
            && (project.owner_id == user.id || project.participant_ids.contains(&user.id)))
    }

    pub async fn can_modify_project(&self, user_id: Uuid, project_id: Uuid) -> Result<bool> {
        let project = self.get_project(project_id).await?;
        let user = self.get_user(user_id).await?;
        Ok(project.owner_id == user.id)
    }

    pub async fn can_access_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        let event = self.get_event(event_id).await?;
        let user = self.get_user(user_id).await?;

        Ok(user.belongs_to(event.organization_id)
            && (event.creator_id == user.id || event.participant_ids.contains(&user.id)))
    }

    pub async fn can_modify_event(&self, user_id: Uuid, event_id: Uuid) -> Result<bool> {
        let event = self.get_event(event_id).await?;
        let user = self.get_user(user_id).await?;
        Ok(event.creator_id == user.id)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Evaluate `permission` on any guarded resource
    pub async fn authorize(
        &self,
        user_id: Uuid,
        resource: ResourceRef,
        permission: Permission,
    ) -> Result<bool> {
        match (resource, permission) {
            (ResourceRef::File(id), Permission::Access) => self.can_access_file(user_id, id).await,
            (ResourceRef::File(id), Permission::Modify) => self.can_modify_file(user_id, id).await,
            (ResourceRef::Project(id), Permission::Access) => {
                self.can_access_project(user_id, id).await
            }
            (ResourceRef::Project(id), Permission::Modify) => {
                self.can_modify_project(user_id, id).await
            }
            (ResourceRef::Event(id), Permission::Access) => self.can_access_event(user_id, id).await,
            (ResourceRef::Event(id), Permission::Modify) => self.can_modify_event(user_id, id).await,
            (ResourceRef::InviteCode { organization_id }, _) => {
                self.can_create_invite_code(user_id, organization_id).await
            }
        }
    }
}

/// Uploader always; otherwise any member of the file's organization.
/// Deleted files are not accessible to anyone.
fn file_access_allowed(user: &UserAccount, file: &File) -> bool {
    if file.is_deleted {
        return false;
    }

    file.uploader_id == user.id || user.belongs_to(file.organization_id)
}

/// Uploader only, regardless of role
fn file_modify_allowed(user: &UserAccount, file: &File) -> bool {
    file.uploader_id == user.id
}
