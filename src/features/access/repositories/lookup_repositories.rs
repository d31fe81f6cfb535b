//! Read-only lookups against tables owned by the collaboration services.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::error::Result;
use crate::features::access::models::{EventAccess, Organization, ProjectAccess, UserAccount};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>>;
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectAccess>>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventAccess>>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT user_id AS id, organization_id, role
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Organization>> {
        let organization = sqlx::query_as::<_, Organization>(
            r#"
            SELECT organization_id AS id, organization_name AS name
            FROM organizations
            WHERE organization_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(organization)
    }
}

pub struct PgProjectRepository {
    pool: PgPool,
}

impl PgProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectAccess>> {
        let project = sqlx::query_as::<_, ProjectAccess>(
            r#"
            SELECT
                p.project_id AS id,
                p.organization_id,
                p.owner_id,
                COALESCE(
                    ARRAY_AGG(pp.user_id) FILTER (WHERE pp.user_id IS NOT NULL),
                    '{}'
                ) AS participant_ids
            FROM projects p
            LEFT JOIN project_participants pp ON pp.project_id = p.project_id
            WHERE p.project_id = $1
            GROUP BY p.project_id, p.organization_id, p.owner_id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(project)
    }
}

pub struct PgEventRepository {
    pool: PgPool,
}

impl PgEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PgEventRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<EventAccess>> {
        let event = sqlx::query_as::<_, EventAccess>(
            r#"
            SELECT
                e.event_id AS id,
                e.organization_id,
                e.created_by_id AS creator_id,
                COALESCE(
                    ARRAY_AGG(eu.user_id) FILTER (WHERE eu.user_id IS NOT NULL),
                    '{}'
                ) AS participant_ids
            FROM events e
            LEFT JOIN event_users eu ON eu.event_id = e.event_id
            WHERE e.event_id = $1
            GROUP BY e.event_id, e.organization_id, e.created_by_id
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }
}
