use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct CreateAccountRequest {
    pub api_id: i64,
    pub api_hash: String,
    pub phone: String,
}

#[derive(serde::Deserialize)]
pub struct ImportSessionRequest {
    pub session: String,
}

pub async fn list_accounts(State(state): State<AppState>) -> Json<serde_json::Value> {
    match state.accounts.list().await {
        Ok(accounts) => Json(serde_json::json!({ "success": true, "accounts": accounts })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(payload): Json<CreateAccountRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state
        .accounts
        .register(payload.api_id, &payload.api_hash, &payload.phone)
        .await
    {
        Ok(id) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "account_id": id,
                "message": "Account registered. Import a session to make it ready."
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

pub async fn import_session(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<ImportSessionRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state
        .accounts
        .import_session(account_id, &payload.session)
        .await
    {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": "Session imported" })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "Account not found" })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

pub async fn delete_account(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.accounts.delete(account_id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "message": "Account deleted" })),
        ),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "Account not found" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

pub async fn get_account(
    Path(account_id): Path<i64>,
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.accounts.get(account_id).await {
        Ok(Some(account)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "success": true, "account": account })),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "success": false, "error": "Account not found" })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}
