use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

#[axum::debug_handler]
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "transition_policy": state.interview_service.policy().to_string(),
        "pending_webhooks": state.webhook_notifier.as_ref().map(|n| n.pending()).unwrap_or(0),
    });
    (StatusCode::OK, Json(body))
}
