use anyhow::Result;
use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use push_core::config::{Config, ServerConfig};
use push_core::PushContext;
use push_service::{CredentialService, DeviceService};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing;

use crate::admin;
use crate::auth;
use crate::handlers;

/// Everything a request handler needs, shared through an `Extension`.
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub devices: Arc<DeviceService>,
    pub credentials: Arc<CredentialService>,
}

impl ApiState {
    pub fn new(ctx: &PushContext) -> Self {
        ApiState {
            config: ctx.config.clone(),
            devices: Arc::new(DeviceService::new(ctx.devices.clone(), ctx.gateway.clone())),
            credentials: Arc::new(CredentialService::new(ctx.credentials.clone())),
        }
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    match &config.cors_origins {
        Some(origins) => {
            let mut cors = CorsLayer::new();
            for origin in origins.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
                if let Ok(parsed) = origin.parse::<HeaderValue>() {
                    cors = cors.allow_origin(parsed);
                }
            }
            cors.allow_methods([Method::GET, Method::POST])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
                .allow_credentials(true)
        }
        None => {
            tracing::warn!("CORS_ORIGINS not set, using permissive CORS. Set CORS_ORIGINS for production!");
            CorsLayer::permissive()
        }
    }
}

pub fn router(state: ApiState) -> Router {
    let admin_routes = Router::new()
        .route("/push/admin/app/detail", post(admin::app_detail))
        .route("/push/admin/app/ios/update", post(admin::update_ios))
        .route("/push/admin/app/ios/remove", post(admin::remove_ios))
        .route("/push/admin/app/android/update", post(admin::update_android))
        .route("/push/admin/app/android/remove", post(admin::remove_android))
        .route("/push/admin/app/remove", post(admin::remove_app))
        .route_layer(middleware::from_fn(auth::auth_middleware));

    if state.config.server.uses_default_jwt_secret() {
        tracing::warn!("JWT_SECRET not set, admin routes accept tokens signed with the default secret. Set JWT_SECRET for production!");
    }
    let cors = cors_layer(&state.config.server);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/push/device/create", post(handlers::create_device))
        .route("/push/device/status/update", post(handlers::update_status))
        .route("/push/device/remove", post(handlers::remove_device))
        .merge(admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(Extension(state)),
        )
}

pub async fn run(ctx: PushContext) -> Result<()> {
    let server = &ctx.config.server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.api_port).parse()?;
    let app = router(ApiState::new(&ctx));

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
