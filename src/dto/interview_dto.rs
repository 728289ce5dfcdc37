use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::lifecycle::{allowed_transitions, next_canonical_state, progress_ratio, TransitionPolicy};
use crate::models::interview::{
    EventMetadata, Interview, InterviewMode, InterviewState, StateTransitionEvent, TriggeredBy,
};
use crate::models::slot::{RankedSlot, TimeSlot};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInterviewPayload {
    #[validate(length(min = 1))]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    pub job_id: String,
    #[validate(length(min = 1))]
    pub stage: String,
    #[validate(length(min = 1))]
    pub interviewers: Vec<String>,
    #[validate(range(min = 15, max = 480))]
    pub duration_minutes: u32,
    pub mode: Option<InterviewMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionPayload {
    pub state: InterviewState,
    pub triggered_by: TriggeredBy,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<EventMetadata>,
    /// Rejects the transition with 409 unless the interview is still here.
    pub expected_state: Option<InterviewState>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfirmSlotPayload {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub triggered_by: Option<TriggeredBy>,
}

impl ConfirmSlotPayload {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot::new(self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, IntoParams)]
#[serde(default)]
#[into_params(parameter_in = Query)]
pub struct InterviewListQuery {
    pub state: Option<InterviewState>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewResponse {
    pub id: Uuid,
    pub candidate_id: String,
    pub job_id: String,
    pub stage: String,
    pub interviewers: Vec<String>,
    pub duration_minutes: u32,
    pub mode: InterviewMode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub current_state: InterviewState,
    pub progress: f64,
    pub next_state: Option<InterviewState>,
    pub allowed_transitions: Vec<InterviewState>,
    pub version: u64,
    pub proposed_slots: Vec<TimeSlot>,
    pub confirmed_slot: Option<TimeSlot>,
}

impl InterviewResponse {
    pub fn new(interview: &Interview, policy: TransitionPolicy) -> Self {
        let state = interview.current_state();
        let allowed = match policy {
            TransitionPolicy::Strict => allowed_transitions(state).to_vec(),
            TransitionPolicy::Lenient => InterviewState::ALL.to_vec(),
        };

        Self {
            id: interview.id,
            candidate_id: interview.candidate_id.clone(),
            job_id: interview.job_id.clone(),
            stage: interview.stage.clone(),
            interviewers: interview.interviewers.clone(),
            duration_minutes: interview.duration_minutes,
            mode: interview.mode,
            created_at: interview.created_at,
            updated_at: interview
                .last_event()
                .map(|e| e.timestamp)
                .unwrap_or(interview.created_at),
            current_state: state,
            progress: progress_ratio(state),
            next_state: next_canonical_state(state),
            allowed_transitions: allowed,
            version: interview.version(),
            proposed_slots: interview.proposed_slots().to_vec(),
            confirmed_slot: interview.confirmed_slot().copied(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterviewListResponse {
    pub items: Vec<InterviewResponse>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransitionResponse {
    pub interview: InterviewResponse,
    pub event: StateTransitionEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    pub interview_id: Uuid,
    pub current_state: InterviewState,
    pub events: Vec<StateTransitionEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SlotsResponse {
    pub interview_id: Uuid,
    pub current_state: InterviewState,
    pub slots: Vec<RankedSlot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StateCount {
    pub state: InterviewState,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StateCountsResponse {
    pub total: usize,
    pub states: Vec<StateCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PanelistLoad {
    pub interviewer: String,
    pub active_interviews: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PanelistLoadResponse {
    pub items: Vec<PanelistLoad>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interview() -> Interview {
        Interview::new("cand", "job", "Screen", vec!["alice".into()], 30, InterviewMode::Phone)
    }

    #[test]
    fn lenient_response_advertises_every_state() {
        let response = InterviewResponse::new(&interview(), TransitionPolicy::Lenient);
        assert_eq!(response.allowed_transitions, InterviewState::ALL.to_vec());
        assert!(response
            .allowed_transitions
            .iter()
            .all(|s| TransitionPolicy::Lenient.permits(InterviewState::Created, *s)));
    }

    #[test]
    fn strict_response_follows_transition_table() {
        let response = InterviewResponse::new(&interview(), TransitionPolicy::Strict);
        assert_eq!(response.allowed_transitions, vec![InterviewState::SlotsGenerated]);
        assert_eq!(response.next_state, Some(InterviewState::SlotsGenerated));
    }
}
