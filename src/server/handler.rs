use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, warn};

use crate::server::AppState;

pub async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Hello, world!"}))
}

pub async fn public() -> Json<serde_json::Value> {
    Json(json!({"message": "This is a public endpoint."}))
}

pub async fn protected() -> Json<serde_json::Value> {
    Json(json!({"message": "This is a protected endpoint."}))
}

/// Prometheus text-format metrics endpoint
pub async fn metrics() -> Response {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    match String::from_utf8(buffer) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to convert metrics to UTF-8: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Liveness endpoint. A store outage is reported but does not make the
/// service unhealthy: with fail-open the request path keeps working.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store = match state.store.health_check().await {
        Ok(()) => "up",
        Err(e) => {
            warn!("Health check: bucket store unreachable: {}", e);
            "down"
        }
    };

    Json(json!({"status": "ok", "store": store}))
}
