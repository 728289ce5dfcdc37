use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::slot::TimeSlot;
use crate::utils::time::now;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterviewState {
    Created,
    SlotsGenerated,
    SlotConfirmed,
    Notified,
    InProgress,
    NoShow,
    Rescheduled,
    Completed,
    Closed,
}

impl InterviewState {
    pub const ALL: [InterviewState; 9] = [
        InterviewState::Created,
        InterviewState::SlotsGenerated,
        InterviewState::SlotConfirmed,
        InterviewState::Notified,
        InterviewState::InProgress,
        InterviewState::NoShow,
        InterviewState::Rescheduled,
        InterviewState::Completed,
        InterviewState::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InterviewState::Created => "created",
            InterviewState::SlotsGenerated => "slots_generated",
            InterviewState::SlotConfirmed => "slot_confirmed",
            InterviewState::Notified => "notified",
            InterviewState::InProgress => "in_progress",
            InterviewState::NoShow => "no_show",
            InterviewState::Rescheduled => "rescheduled",
            InterviewState::Completed => "completed",
            InterviewState::Closed => "closed",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == InterviewState::Closed
    }

    /// Exceptional states outside the canonical order.
    pub fn is_branch(self) -> bool {
        matches!(self, InterviewState::NoShow | InterviewState::Rescheduled)
    }

    /// Counted towards panelist load.
    pub fn is_active(self) -> bool {
        !matches!(self, InterviewState::Completed | InterviewState::Closed)
    }
}

impl fmt::Display for InterviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    System,
    Candidate,
    Recruiter,
    Ats,
}

impl fmt::Display for TriggeredBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TriggeredBy::System => "system",
            TriggeredBy::Candidate => "candidate",
            TriggeredBy::Recruiter => "recruiter",
            TriggeredBy::Ats => "ats",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InterviewMode {
    #[default]
    Video,
    Phone,
    Onsite,
}

pub type EventMetadata = Map<String, JsonValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StateTransitionEvent {
    pub state: InterviewState,
    pub timestamp: DateTime<Utc>,
    pub triggered_by: TriggeredBy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<EventMetadata>,
}

impl StateTransitionEvent {
    pub fn new(
        state: InterviewState,
        triggered_by: TriggeredBy,
        metadata: Option<EventMetadata>,
    ) -> Self {
        Self {
            state,
            timestamp: now(),
            triggered_by,
            metadata,
        }
    }
}

/// One candidate's interview for one pipeline stage.
///
/// The state and its history are only reachable through
/// [`InterviewLifecycle`](crate::lifecycle::InterviewLifecycle), which keeps
/// `current_state` equal to the state of the last recorded event.
#[derive(Debug, Clone, Serialize)]
pub struct Interview {
    pub id: Uuid,
    pub candidate_id: String,
    pub job_id: String,
    pub stage: String,
    pub interviewers: Vec<String>,
    pub duration_minutes: u32,
    pub mode: InterviewMode,
    pub created_at: DateTime<Utc>,
    current_state: InterviewState,
    state_history: Vec<StateTransitionEvent>,
    proposed_slots: Vec<TimeSlot>,
    confirmed_slot: Option<TimeSlot>,
}

impl Interview {
    pub fn new(
        candidate_id: impl Into<String>,
        job_id: impl Into<String>,
        stage: impl Into<String>,
        interviewers: Vec<String>,
        duration_minutes: u32,
        mode: InterviewMode,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id: candidate_id.into(),
            job_id: job_id.into(),
            stage: stage.into(),
            interviewers,
            duration_minutes,
            mode,
            created_at: now(),
            current_state: InterviewState::Created,
            state_history: Vec::new(),
            proposed_slots: Vec::new(),
            confirmed_slot: None,
        }
    }

    pub fn current_state(&self) -> InterviewState {
        self.current_state
    }

    pub fn state_history(&self) -> &[StateTransitionEvent] {
        &self.state_history
    }

    pub fn last_event(&self) -> Option<&StateTransitionEvent> {
        self.state_history.last()
    }

    /// Number of recorded transitions; bumps by one on every transition.
    pub fn version(&self) -> u64 {
        self.state_history.len() as u64
    }

    pub fn proposed_slots(&self) -> &[TimeSlot] {
        &self.proposed_slots
    }

    pub fn confirmed_slot(&self) -> Option<&TimeSlot> {
        self.confirmed_slot.as_ref()
    }

    pub(crate) fn record(&mut self, event: StateTransitionEvent) -> &StateTransitionEvent {
        self.current_state = event.state;
        self.state_history.push(event);
        &self.state_history[self.state_history.len() - 1]
    }

    pub(crate) fn set_proposed_slots(&mut self, slots: Vec<TimeSlot>) {
        self.proposed_slots = slots;
        self.confirmed_slot = None;
    }

    pub(crate) fn set_confirmed_slot(&mut self, slot: TimeSlot) {
        self.confirmed_slot = Some(slot);
    }
}
