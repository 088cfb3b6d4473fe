use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::AppState;

pub(crate) fn is_loopback(host: &str) -> bool {
    host == "127.0.0.1" || host == "::1" || host == "localhost"
}

pub async fn require_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let any_tokens_exist = match state.storage.has_any_api_tokens().await {
        Ok(found) => found,
        Err(e) => {
            warn!("Token lookup failed: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": "Token lookup failed" })),
            )
                .into_response();
        }
    };

    // No tokens configured: open access only on loopback.
    if !any_tokens_exist {
        if is_loopback(&state.api_host) {
            return next.run(req).await;
        }
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "error": "No API tokens configured. Create one with 'tgroster token create <name>' before exposing on a non-loopback address."
            })),
        )
            .into_response();
    }

    let raw_token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    let Some(raw_token) = raw_token else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "success": false,
                "error": "Missing or invalid Authorization header. Use: Bearer <token>"
            })),
        )
            .into_response();
    };

    if state
        .storage
        .validate_api_token(&raw_token)
        .await
        .unwrap_or(false)
    {
        next.run(req).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "success": false, "error": "Invalid or unauthorized API token" })),
        )
            .into_response()
    }
}
