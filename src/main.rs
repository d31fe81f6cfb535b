mod core;
mod features;
mod modules;
mod shared;

use crate::core::config::Config;
use crate::core::openapi::{ApiDoc, DocsInfoModifier};
use crate::core::{database, middleware};
use crate::features::access::repositories::{
    PgEventRepository, PgOrganizationRepository, PgProjectRepository, PgUserRepository,
};
use crate::features::access::{routes as access_routes, AuthorizationService};
use crate::features::auth::JwtValidator;
use crate::features::files::repositories::PgFileRepository;
use crate::features::files::{routes as files_routes, FileService, RetentionSweeper, StorageState};
use crate::modules::storage::create_provider;
use axum::{middleware::from_fn, routing::get, Json, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::Modify;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    // Build Tokio runtime with configurable worker threads
    let worker_threads = std::env::var("TOKIO_WORKER_THREADS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|p| p.get())
                .unwrap_or(4)
        });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(worker_threads)
        .max_blocking_threads(worker_threads * 4)
        .enable_all()
        .build()?;

    runtime.block_on(async_main(worker_threads))
}

async fn async_main(worker_threads: usize) -> anyhow::Result<()> {
    // Load .env file BEFORE initializing logger so RUST_LOG is available
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "System info: tokio_worker_threads={}, pid={}",
        worker_threads,
        std::process::id()
    );
    tracing::info!("Configuration loaded successfully");

    // Create database connection pool
    let pool = database::create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    // Run migrations automatically
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    tracing::info!("Database migrations completed successfully");

    // Initialize auth
    let jwt_validator = Arc::new(JwtValidator::new(
        &config.auth.jwt_secret,
        config.auth.jwt_leeway,
    ));
    tracing::info!("Auth configuration initialized");

    // Storage: an unknown provider is a configuration error, an unreachable
    // backend only disables the file subsystem
    let provider = create_provider(&config.storage)
        .map_err(|e| anyhow::anyhow!("Failed to create storage provider: {}", e))?;
    let storage = StorageState::connect(provider).await;
    if !storage.is_ready() {
        tracing::warn!("Starting with file storage unavailable");
    }

    // Initialize Authorization Service
    let authorization_service = Arc::new(AuthorizationService::new(
        Arc::new(PgUserRepository::new(pool.clone())),
        Arc::new(PgOrganizationRepository::new(pool.clone())),
        Arc::new(PgProjectRepository::new(pool.clone())),
        Arc::new(PgEventRepository::new(pool.clone())),
        Arc::new(PgFileRepository::new(pool.clone())),
    ));
    tracing::info!("Authorization service initialized");

    // Initialize File Service
    let file_service = Arc::new(FileService::new(
        Arc::new(PgFileRepository::new(pool.clone())),
        Arc::clone(&authorization_service),
        storage,
        config.files.clone(),
        config.retention.retention_period,
    ));
    tracing::info!("File service initialized");

    // Spawn the retention sweeper
    let sweeper = if config.retention.enabled {
        let handle = RetentionSweeper::new(Arc::clone(&file_service), &config.retention).start();
        tracing::info!("Retention sweeper spawned");
        Some(handle)
    } else {
        tracing::info!("Retention sweeper disabled");
        None
    };

    // OpenAPI document with info from config
    let docs_modifier = DocsInfoModifier {
        title: config.docs.title.clone(),
        version: config.docs.version.clone(),
    };

    let mut openapi = ApiDoc::openapi();
    docs_modifier.modify(&mut openapi);
    let openapi = Arc::new(openapi);

    let docs_route = Router::new().route(
        "/api-docs/openapi.json",
        get(move || {
            let openapi = Arc::clone(&openapi);
            async move { Json(openapi.as_ref().clone()) }
        }),
    );

    let docs = if let Some(credentials) = config.docs.credentials() {
        tracing::info!("API docs basic auth enabled");
        docs_route.layer(from_fn(middleware::basic_auth_middleware(Arc::new(
            credentials,
        ))))
    } else {
        tracing::info!("API docs basic auth disabled (no credentials configured)");
        docs_route
    };

    // Protected routes (require JWT authentication)
    let protected_routes = Router::new()
        .merge(files_routes::routes(Arc::clone(&file_service)))
        .merge(access_routes::routes(Arc::clone(&authorization_service)))
        .route_layer(axum::middleware::from_fn_with_state(
            jwt_validator.clone(),
            middleware::auth_middleware,
        ));

    // Simple health check endpoint (no auth required)
    async fn health_check() -> axum::http::StatusCode {
        axum::http::StatusCode::OK
    }
    let health_route = Router::new().route("/health", get(health_check));

    let app = Router::new()
        .merge(docs)
        .merge(protected_routes)
        .merge(health_route)
        .layer(middleware::cors_layer(
            config.app.cors_allowed_origins.clone(),
        ))
        .layer(
            ServiceBuilder::new()
                // Generate X-Request-Id using UUID v7 (or use client-provided one)
                .layer(SetRequestIdLayer::x_request_id(middleware::MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(middleware::MakeSpanWithRequestId)
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                // Propagate X-Request-Id to response headers
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    // Start server
    let addr = config.app.server_address();
    let socket_addr: std::net::SocketAddr = addr
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

    // Use socket2 for TCP listener configuration
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(socket_addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nodelay(true)?;

    #[cfg(target_os = "linux")]
    {
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(60))
            .with_interval(std::time::Duration::from_secs(10))
            .with_retries(3);
        socket.set_tcp_keepalive(&keepalive)?;
    }
    #[cfg(not(target_os = "linux"))]
    {
        let keepalive = socket2::TcpKeepalive::new().with_time(std::time::Duration::from_secs(60));
        socket.set_tcp_keepalive(&keepalive)?;
    }

    socket.set_nonblocking(true)?;
    socket.bind(&socket_addr.into())?;
    socket.listen(1024)?;

    let listener = tokio::net::TcpListener::from_std(socket.into())?;
    tracing::info!("Server listening on {}", format!("http://{}", addr));
    tracing::info!(
        "OpenAPI document available at {}",
        format!("http://{}/api-docs/openapi.json", addr)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.stop().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
