use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::utils::time::{now, to_rfc3339};
use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "time": to_rfc3339(now()),
        "checked_in": state.collections.checked_in_count().await,
        "assigning": state.assignment_coordinator.assigning().len(),
    });
    (StatusCode::OK, Json(body))
}
