use axum::{extract::State, http::HeaderMap, Json};
use serde_json::json;

use crate::{
    dto::interview_dto::{InterviewResponse, TransitionResponse},
    dto::webhook_dto::AtsEventPayload,
    error::{Error, Result},
    models::interview::TriggeredBy,
    services::interview_service::TransitionRequest,
    services::notification_service::STATE_CHANGED_EVENT,
    utils::crypto::secrets_match,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/webhook/ats",
    request_body = AtsEventPayload,
    responses(
        (status = 200, description = "Transition applied", body = TransitionResponse),
        (status = 400, description = "Unexpected event"),
        (status = 401, description = "Missing or invalid webhook secret"),
        (status = 422, description = "Transition not allowed from the current state")
    )
)]
pub async fn handle_ats_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AtsEventPayload>,
) -> Result<Json<serde_json::Value>> {
    verify_secret(&headers, &state.webhook_secret)?;
    if payload.event != STATE_CHANGED_EVENT {
        return Err(Error::BadRequest(format!("unexpected_event: {}", payload.event)));
    }

    tracing::info!(
        interview_id = %payload.interview_id,
        state = %payload.state,
        "ATS state event received"
    );

    let service = &state.interview_service;
    let mut request = TransitionRequest::new(payload.state, TriggeredBy::Ats);
    request.metadata = payload.metadata;
    let (interview, event) = service.transition(payload.interview_id, request)?;

    let response = TransitionResponse {
        interview: InterviewResponse::new(&interview, service.policy()),
        event,
    };
    Ok(Json(json!({ "applied": true, "result": response })))
}

fn verify_secret(headers: &HeaderMap, expected: &str) -> Result<()> {
    let Some(secret_hdr) = headers.get("x-webhook-secret") else {
        return Err(Error::Unauthorized("missing_webhook_secret".into()));
    };
    let provided = secret_hdr
        .to_str()
        .map_err(|_| Error::Unauthorized("invalid_secret_header".into()))?;
    if secrets_match(provided, expected) {
        Ok(())
    } else {
        Err(Error::Unauthorized("invalid_webhook_secret".into()))
    }
}
