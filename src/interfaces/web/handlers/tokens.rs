use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct CreateTokenRequest {
    pub name: String,
}

fn failure(status: StatusCode, error: impl ToString) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "success": false, "error": error.to_string() })),
    )
}

pub async fn list_tokens(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    match state.storage.list_api_tokens().await {
        Ok(tokens) => (
            StatusCode::OK,
            Json(json!({ "success": true, "tokens": tokens })),
        ),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// The raw value is in this response only.
pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<CreateTokenRequest>,
) -> (StatusCode, Json<Value>) {
    let name = payload.name.trim();
    if name.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "token name must not be blank");
    }

    match state.storage.create_api_token(name).await {
        Ok((token, record)) => (
            StatusCode::CREATED,
            Json(json!({ "success": true, "token": token, "record": record })),
        ),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

pub async fn delete_token(
    Path(token_id): Path<String>,
    State(state): State<AppState>,
) -> (StatusCode, Json<Value>) {
    match state.storage.delete_api_token(&token_id).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "success": true }))),
        Ok(false) => failure(StatusCode::NOT_FOUND, format!("no token with id {}", token_id)),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}
