use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::interview_dto::{
        ConfirmSlotPayload, CreateInterviewPayload, HistoryResponse, InterviewListQuery,
        InterviewListResponse, InterviewResponse, PanelistLoad, PanelistLoadResponse,
        SlotsResponse, StateCount, StateCountsResponse, TransitionPayload, TransitionResponse,
    },
    error::{Error, Result},
    models::interview::TriggeredBy,
    services::interview_service::TransitionRequest,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/interviews",
    request_body = CreateInterviewPayload,
    responses(
        (status = 201, description = "Interview created", body = InterviewResponse),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_interview(
    State(state): State<AppState>,
    Json(payload): Json<CreateInterviewPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let service = &state.interview_service;
    let interview = service.create(payload)?;
    Ok((
        StatusCode::CREATED,
        Json(InterviewResponse::new(&interview, service.policy())),
    ))
}

#[utoipa::path(
    get,
    path = "/api/interviews",
    params(InterviewListQuery),
    responses(
        (status = 200, description = "Interviews", body = InterviewListResponse)
    )
)]
#[axum::debug_handler]
pub async fn list_interviews(
    State(state): State<AppState>,
    Query(query): Query<InterviewListQuery>,
) -> Result<impl IntoResponse> {
    let service = &state.interview_service;
    let list = service.list(query)?;
    let policy = service.policy();
    Ok(Json(InterviewListResponse {
        items: list
            .items
            .iter()
            .map(|i| InterviewResponse::new(i, policy))
            .collect(),
        total: list.total,
        page: list.page,
        per_page: list.per_page,
        total_pages: list.total_pages,
    }))
}

#[utoipa::path(
    get,
    path = "/api/interviews/stats",
    responses(
        (status = 200, description = "Interview counts per state", body = StateCountsResponse)
    )
)]
#[axum::debug_handler]
pub async fn interview_stats(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let counts = state.interview_service.state_counts()?;
    let total: usize = counts.iter().map(|(_, c)| c).sum();
    Ok(Json(StateCountsResponse {
        total,
        states: counts
            .into_iter()
            .map(|(state, count)| StateCount { state, count })
            .collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{id}",
    params(("id" = Uuid, Path, description = "Interview ID")),
    responses(
        (status = 200, description = "Interview", body = InterviewResponse),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let service = &state.interview_service;
    let interview = service.get(id)?;
    Ok(Json(InterviewResponse::new(&interview, service.policy())))
}

#[utoipa::path(
    get,
    path = "/api/interviews/{id}/history",
    params(("id" = Uuid, Path, description = "Interview ID")),
    responses(
        (status = 200, description = "Transition history, oldest first", body = HistoryResponse),
        (status = 404, description = "Interview not found")
    )
)]
#[axum::debug_handler]
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let interview = state.interview_service.get(id)?;
    Ok(Json(HistoryResponse {
        interview_id: interview.id,
        current_state: interview.current_state(),
        events: interview.state_history().to_vec(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/transition",
    params(("id" = Uuid, Path, description = "Interview ID")),
    request_body = TransitionPayload,
    responses(
        (status = 200, description = "Transition recorded", body = TransitionResponse),
        (status = 404, description = "Interview not found"),
        (status = 409, description = "Interview changed concurrently"),
        (status = 422, description = "Transition not allowed from the current state")
    )
)]
#[axum::debug_handler]
pub async fn transition_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionPayload>,
) -> Result<impl IntoResponse> {
    let service = &state.interview_service;
    let (interview, event) = service.transition(
        id,
        TransitionRequest {
            state: payload.state,
            triggered_by: payload.triggered_by,
            metadata: payload.metadata,
            expected_state: payload.expected_state,
        },
    )?;
    Ok(Json(TransitionResponse {
        interview: InterviewResponse::new(&interview, service.policy()),
        event,
    }))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/slots/generate",
    params(("id" = Uuid, Path, description = "Interview ID")),
    responses(
        (status = 200, description = "Proposed slots, best first", body = SlotsResponse),
        (status = 404, description = "Interview not found"),
        (status = 409, description = "No free slots"),
        (status = 422, description = "Slots cannot be generated in the current state")
    )
)]
#[axum::debug_handler]
pub async fn generate_slots(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (interview, slots) = state.interview_service.generate_slots(id)?;
    Ok(Json(SlotsResponse {
        interview_id: interview.id,
        current_state: interview.current_state(),
        slots,
    }))
}

#[utoipa::path(
    post,
    path = "/api/interviews/{id}/slots/confirm",
    params(("id" = Uuid, Path, description = "Interview ID")),
    request_body = ConfirmSlotPayload,
    responses(
        (status = 200, description = "Slot confirmed", body = TransitionResponse),
        (status = 400, description = "Slot was not proposed"),
        (status = 404, description = "Interview not found"),
        (status = 422, description = "Slot cannot be confirmed in the current state")
    )
)]
#[axum::debug_handler]
pub async fn confirm_slot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmSlotPayload>,
) -> Result<impl IntoResponse> {
    let slot = payload.slot();
    if slot.is_empty() {
        return Err(Error::BadRequest("Slot end must be after its start".into()));
    }
    let service = &state.interview_service;
    let (interview, event) = service.confirm_slot(
        id,
        slot,
        payload.triggered_by.unwrap_or(TriggeredBy::Candidate),
    )?;
    Ok(Json(TransitionResponse {
        interview: InterviewResponse::new(&interview, service.policy()),
        event,
    }))
}

#[utoipa::path(
    get,
    path = "/api/panelists/load",
    responses(
        (status = 200, description = "Active interviews per interviewer", body = PanelistLoadResponse)
    )
)]
#[axum::debug_handler]
pub async fn panelist_load(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let items = state
        .interview_service
        .panelist_load()?
        .into_iter()
        .map(|(interviewer, active_interviews)| PanelistLoad {
            interviewer,
            active_interviews,
        })
        .collect();
    Ok(Json(PanelistLoadResponse { items }))
}
