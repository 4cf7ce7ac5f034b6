use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::limiter::{Outcome, RequestHints};
use crate::metrics;
use crate::server::AppState;

/// Header carrying the caller-supplied identifier
const IDENTITY_HEADER: &str = "user_id";

/// Header carrying the caller's tier claim
const TIER_HEADER: &str = "x-user-tier";

/// Response-extension marker for requests that were let through by the
/// fail-open policy. The request counter skips these so they are never
/// reported as cleanly allowed.
#[derive(Debug, Clone, Copy)]
struct FailedOpen;

/// Rate-limit middleware for guarded routes.
///
/// Resolves the caller from the request, runs one atomic decision
/// against the bucket store, and either forwards the request or rejects
/// it with 429.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let hints = RequestHints {
        user_id: header_value(&request, IDENTITY_HEADER),
        tier: header_value(&request, TIER_HEADER),
        remote_addr: addr.ip().to_string(),
    };

    let decision = state.limiter.check(&hints, unix_now()).await;

    if !decision.allowed {
        metrics::record_request(&path, Outcome::Denied);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"message": "You have exceeded the rate limit."})),
        )
            .into_response();
    }

    let mut response = next.run(request).await;

    if decision.outcome == Outcome::ErrorAllowed {
        metrics::record_request(&path, Outcome::ErrorAllowed);
        response.extensions_mut().insert(FailedOpen);
    }

    response
}

/// Request counter middleware, applied to every route. Denied and
/// fail-open requests are already counted by the rate-limit middleware.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    if response.status() != StatusCode::TOO_MANY_REQUESTS
        && response.extensions().get::<FailedOpen>().is_none()
    {
        metrics::record_request(&path, Outcome::Allowed);
    }

    response
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
