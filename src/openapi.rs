use utoipa::OpenApi;

use crate::dto::interview_dto::{
    ConfirmSlotPayload, CreateInterviewPayload, HistoryResponse, InterviewListResponse,
    InterviewResponse, PanelistLoad, PanelistLoadResponse, SlotsResponse, StateCount,
    StateCountsResponse, TransitionPayload, TransitionResponse,
};
use crate::dto::webhook_dto::AtsEventPayload;
use crate::models::interview::{InterviewMode, InterviewState, StateTransitionEvent, TriggeredBy};
use crate::models::slot::{RankedSlot, TimeSlot};
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::interview::create_interview,
        routes::interview::list_interviews,
        routes::interview::interview_stats,
        routes::interview::get_interview,
        routes::interview::get_history,
        routes::interview::transition_interview,
        routes::interview::generate_slots,
        routes::interview::confirm_slot,
        routes::interview::panelist_load,
        routes::webhook::handle_ats_event,
    ),
    components(schemas(
        InterviewState,
        TriggeredBy,
        InterviewMode,
        StateTransitionEvent,
        TimeSlot,
        RankedSlot,
        CreateInterviewPayload,
        TransitionPayload,
        ConfirmSlotPayload,
        InterviewResponse,
        InterviewListResponse,
        TransitionResponse,
        HistoryResponse,
        SlotsResponse,
        StateCount,
        StateCountsResponse,
        PanelistLoad,
        PanelistLoadResponse,
        AtsEventPayload,
    )),
    tags((name = "interviews", description = "Interview lifecycle"))
)]
pub struct ApiDoc;
