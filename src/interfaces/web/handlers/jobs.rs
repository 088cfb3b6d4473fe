use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::core::ingest::IngestError;
use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct SubmitJobRequest {
    pub account_id: i64,
    pub group: String,
}

pub async fn submit_job(
    State(state): State<AppState>,
    Json(payload): Json<SubmitJobRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if payload.group.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "success": false, "error": "Group reference is required" })),
        );
    }

    match state
        .orchestrator
        .submit(payload.account_id, &payload.group)
        .await
    {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "success": true, "job_id": job_id })),
        ),
        Err(e @ IngestError::AccountNotReady(_)) => (
            StatusCode::PRECONDITION_FAILED,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        ),
    }
}

pub async fn job_status(
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> Json<serde_json::Value> {
    let snapshot = state.orchestrator.status(&job_id).await;
    Json(serde_json::json!({ "status": snapshot.status, "count": snapshot.count }))
}

/// Plain-text status line for shell polling: `status=<s> count=<n>`.
pub async fn job_status_text(
    Path(job_id): Path<String>,
    State(state): State<AppState>,
) -> String {
    let snapshot = state.orchestrator.status(&job_id).await;
    format!("status={} count={}", snapshot.status, snapshot.count)
}

pub async fn list_jobs(State(state): State<AppState>) -> Json<serde_json::Value> {
    let jobs = state.orchestrator.list().await;
    Json(serde_json::json!({ "success": true, "jobs": jobs }))
}
