use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::core::export::render_csv;
use crate::core::storage::DEFAULT_RECENT_LIMIT;
use crate::interfaces::web::AppState;

#[derive(serde::Deserialize)]
pub struct GroupFilter {
    pub group_id: Option<String>,
}

#[derive(serde::Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

fn group_filter(filter: &GroupFilter) -> Option<&str> {
    filter
        .group_id
        .as_deref()
        .map(str::trim)
        .filter(|g| !g.is_empty())
}

pub async fn list_members(
    State(state): State<AppState>,
    Query(filter): Query<GroupFilter>,
) -> Json<serde_json::Value> {
    match state.storage.list_members(group_filter(&filter)).await {
        Ok(members) => Json(serde_json::json!({ "success": true, "members": members })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn recent_members(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<serde_json::Value> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    match state.storage.recent_members(limit).await {
        Ok(members) => Json(serde_json::json!({ "success": true, "members": members })),
        Err(e) => Json(serde_json::json!({ "success": false, "error": e.to_string() })),
    }
}

pub async fn export_csv(
    State(state): State<AppState>,
    Query(filter): Query<GroupFilter>,
) -> Response {
    match state.storage.list_members(group_filter(&filter)).await {
        Ok(rows) => (
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"members.csv\"",
                ),
            ],
            render_csv(&rows),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}
