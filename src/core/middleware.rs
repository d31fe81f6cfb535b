use crate::core::error::AppError;
use crate::features::auth::JwtValidator;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        // Parse origins into HeaderValue
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"API Docs\"")],
                "Unauthorized",
            )
                .into_response())
        })
    }
}

pub async fn auth_middleware(
    State(validator): State<Arc<JwtValidator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extract Authorization header
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    // Validate Bearer format
    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Unauthorized("Invalid authorization header format".to_string())
    })?;

    // Validate token
    let user = validator.validate_token(token)?;

    // Insert authenticated user into request extensions
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn, routing::get, Router};
    use axum_test::TestServer;
    use std::time::Duration;

    use crate::features::auth::model::AuthenticatedUser;
    use crate::shared::test_helpers::{issue_token, TEST_JWT_SECRET};

    async fn whoami(user: AuthenticatedUser) -> String {
        user.user_id.to_string()
    }

    fn protected() -> TestServer {
        let validator = Arc::new(JwtValidator::new(TEST_JWT_SECRET, Duration::from_secs(0)));
        let app = Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(validator, auth_middleware));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_token_sets_user() {
        let user_id = Uuid::new_v4();
        let response = protected()
            .get("/whoami")
            .authorization_bearer(issue_token(user_id, 300))
            .await;

        response.assert_status_ok();
        response.assert_text(user_id.to_string());
    }

    #[tokio::test]
    async fn test_missing_or_expired_token_rejected() {
        let server = protected();
        server.get("/whoami").await.assert_status_unauthorized();
        server
            .get("/whoami")
            .authorization_bearer(issue_token(Uuid::new_v4(), -600))
            .await
            .assert_status_unauthorized();
        server
            .get("/whoami")
            .authorization("Token abc")
            .await
            .assert_status_unauthorized();
    }

    #[tokio::test]
    async fn test_basic_auth_guards_docs() {
        let app = Router::new()
            .route("/docs", get(|| async { "ok" }))
            .layer(from_fn(basic_auth_middleware(Arc::new(
                "docs:secret".to_string(),
            ))));
        let server = TestServer::new(app).unwrap();

        server.get("/docs").await.assert_status_unauthorized();
        server
            .get("/docs")
            .authorization(format!("Basic {}", BASE64_STANDARD.encode("docs:secret")))
            .await
            .assert_status_ok();
    }
}
