pub mod handler;
pub mod middleware;

use axum::middleware as axum_middleware;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::{RateLimitError, Result};
use crate::limiter::RateLimiter;
use crate::redis::BucketStore;

/// HTTP server configuration
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HTTP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared application state handed to handlers and middleware
pub struct AppState {
    pub limiter: Arc<dyn RateLimiter>,
    pub store: Arc<dyn BucketStore>,
}

/// Build the application router.
///
/// Only `/protected` runs the rate-limit middleware; the request
/// counter middleware wraps every route.
pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/protected", get(handler::protected))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit,
        ));

    Router::new()
        .route("/", get(handler::root))
        .route("/public", get(handler::public))
        .merge(protected)
        .route("/metrics", get(handler::metrics))
        .route("/healthz", get(handler::health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(middleware::track_requests)),
        )
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_server(config: ServerConfig, state: Arc<AppState>) -> Result<()> {
    let addr: SocketAddr = config
        .addr()
        .parse()
        .map_err(|e| RateLimitError::InternalError(format!("Invalid server address: {}", e)))?;

    info!("Starting HTTP server on {}", addr);

    let router = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(RateLimitError::FileSystemError)?;

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| RateLimitError::InternalError(format!("Server error: {}", e)))?;

    Ok(())
}
