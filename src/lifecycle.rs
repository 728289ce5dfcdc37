//! Interview lifecycle: the canonical happy path, the transition table and the
//! single step that moves an [`Interview`] from one state to the next.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::models::interview::{
    EventMetadata, Interview, InterviewState, StateTransitionEvent, TriggeredBy,
};

/// The happy path every successful interview walks through.
pub const CANONICAL_ORDER: [InterviewState; 7] = [
    InterviewState::Created,
    InterviewState::SlotsGenerated,
    InterviewState::SlotConfirmed,
    InterviewState::Notified,
    InterviewState::InProgress,
    InterviewState::Completed,
    InterviewState::Closed,
];

fn canonical_index(state: InterviewState) -> Option<usize> {
    CANONICAL_ORDER.iter().position(|s| *s == state)
}

/// Percentage of the happy path covered once `state` is reached.
/// Branch states report `0.0`.
pub fn progress_ratio(state: InterviewState) -> f64 {
    match canonical_index(state) {
        Some(idx) => (idx + 1) as f64 / CANONICAL_ORDER.len() as f64 * 100.0,
        None => 0.0,
    }
}

pub fn next_canonical_state(state: InterviewState) -> Option<InterviewState> {
    let idx = canonical_index(state)?;
    CANONICAL_ORDER.get(idx + 1).copied()
}

/// Targets the strict policy accepts from `state`.
pub fn allowed_transitions(state: InterviewState) -> &'static [InterviewState] {
    use InterviewState::*;
    match state {
        Created => &[SlotsGenerated],
        SlotsGenerated => &[SlotConfirmed, Rescheduled],
        SlotConfirmed => &[Notified, Rescheduled],
        Notified => &[InProgress, NoShow, Rescheduled],
        InProgress => &[Completed, NoShow],
        NoShow => &[Rescheduled, Closed],
        Rescheduled => &[SlotsGenerated, SlotConfirmed, Closed],
        Completed => &[Closed],
        Closed => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any target from any state.
    Lenient,
    /// Only targets listed by [`allowed_transitions`].
    #[default]
    Strict,
}

impl TransitionPolicy {
    pub fn permits(self, from: InterviewState, to: InterviewState) -> bool {
        match self {
            TransitionPolicy::Lenient => true,
            TransitionPolicy::Strict => allowed_transitions(from).contains(&to),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(TransitionPolicy::Lenient),
            "strict" => Ok(TransitionPolicy::Strict),
            other => Err(format!("unknown transition policy '{}'", other)),
        }
    }
}

impl fmt::Display for TransitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionPolicy::Lenient => f.write_str("lenient"),
            TransitionPolicy::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("Illegal transition from {current} to {attempted}")]
    Illegal {
        current: InterviewState,
        attempted: InterviewState,
    },
}

/// Outbound hook fired after every transition.
#[cfg_attr(test, mockall::automock)]
pub trait StateChangeListener: Send + Sync {
    fn on_state_change(&self, interview: &Interview, event: &StateTransitionEvent);
}

#[derive(Clone, Default)]
pub struct InterviewLifecycle {
    policy: TransitionPolicy,
    listeners: Vec<Arc<dyn StateChangeListener>>,
}

impl InterviewLifecycle {
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            policy,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn StateChangeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.policy
    }

    /// Validates and records a transition without notifying listeners.
    pub fn apply<'a>(
        &self,
        interview: &'a mut Interview,
        state: InterviewState,
        triggered_by: TriggeredBy,
        metadata: Option<EventMetadata>,
    ) -> Result<&'a StateTransitionEvent, TransitionError> {
        let current = interview.current_state();
        if !self.policy.permits(current, state) {
            return Err(TransitionError::Illegal {
                current,
                attempted: state,
            });
        }
        Ok(interview.record(StateTransitionEvent::new(state, triggered_by, metadata)))
    }

    pub fn notify(&self, interview: &Interview, event: &StateTransitionEvent) {
        for listener in &self.listeners {
            listener.on_state_change(interview, event);
        }
    }

    pub fn transition(
        &self,
        interview: &mut Interview,
        state: InterviewState,
        triggered_by: TriggeredBy,
        metadata: Option<EventMetadata>,
    ) -> Result<StateTransitionEvent, TransitionError> {
        let event = self
            .apply(interview, state, triggered_by, metadata)?
            .clone();
        self.notify(interview, &event);
        Ok(event)
    }
}
