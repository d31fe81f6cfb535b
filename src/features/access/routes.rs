use axum::{routing::get, Router};
use std::sync::Arc;

use crate::features::access::handlers::check_access;
use crate::features::access::services::AuthorizationService;

pub fn routes(authorization: Arc<AuthorizationService>) -> Router {
    Router::new()
        .route("/api/access/{kind}/{id}", get(check_access))
        .with_state(authorization)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use serde_json::Value;

    use crate::features::access::models::Role;
    use crate::shared::test_helpers::{with_user, TestWorld};

    #[tokio::test]
    async fn test_project_permissions() {
        let world = TestWorld::new().await;
        let owner = world.add_user(world.org, Role::User);
        let participant = world.add_user(world.org, Role::User);
        let project = world.add_project(world.org, owner, &[participant]);

        let server =
            TestServer::new(with_user(routes(world.authorization()), participant)).unwrap();

        let access: Value = server
            .get(&format!("/api/access/project/{}", project))
            .await
            .json();
        assert_eq!(access["data"]["allowed"], true);
        assert_eq!(access["data"]["permission"], "access");

        let modify: Value = server
            .get(&format!("/api/access/project/{}", project))
            .add_query_param("permission", "modify")
            .await
            .json();
        assert_eq!(modify["data"]["allowed"], false);
    }

    #[tokio::test]
    async fn test_invite_code_uses_organization_id() {
        let world = TestWorld::new().await;
        let admin = world.add_user(world.org, Role::Admin);
        let server = TestServer::new(with_user(routes(world.authorization()), admin)).unwrap();

        let own: Value = server
            .get(&format!("/api/access/invite_code/{}", world.org))
            .await
            .json();
        assert_eq!(own["data"]["allowed"], true);

        let foreign: Value = server
            .get(&format!("/api/access/invite_code/{}", world.other_org))
            .await
            .json();
        assert_eq!(foreign["data"]["allowed"], false);
    }

    #[tokio::test]
    async fn test_malformed_requests() {
        let world = TestWorld::new().await;
        let user = world.add_user(world.org, Role::User);
        let server = TestServer::new(with_user(routes(world.authorization()), user)).unwrap();

        server
            .get("/api/access/folder/00000000-0000-0000-0000-000000000000")
            .await
            .assert_status_bad_request();
        server
            .get("/api/access/file/not-a-uuid")
            .await
            .assert_status_bad_request();
        server
            .get(&format!("/api/access/event/{}", uuid::Uuid::new_v4()))
            .await
            .assert_status_not_found();
    }
}
