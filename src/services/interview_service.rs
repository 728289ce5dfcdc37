use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::dto::interview_dto::{CreateInterviewPayload, InterviewListQuery};
use crate::error::{Error, Result};
use crate::lifecycle::{InterviewLifecycle, TransitionPolicy};
use crate::models::interview::{
    EventMetadata, Interview, InterviewState, StateTransitionEvent, TriggeredBy,
};
use crate::models::slot::{RankedSlot, TimeSlot};
use crate::services::availability_service::{DayLoad, SlotPlanner};
use crate::services::repository::InterviewRepository;
use crate::utils::time::now;

const DEFAULT_PER_PAGE: usize = 20;
const MAX_PER_PAGE: usize = 100;

pub struct InterviewList {
    pub items: Vec<Interview>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub state: InterviewState,
    pub triggered_by: TriggeredBy,
    pub metadata: Option<EventMetadata>,
    pub expected_state: Option<InterviewState>,
}

impl TransitionRequest {
    pub fn new(state: InterviewState, triggered_by: TriggeredBy) -> Self {
        Self {
            state,
            triggered_by,
            metadata: None,
            expected_state: None,
        }
    }
}

#[derive(Clone)]
pub struct InterviewService {
    repository: Arc<dyn InterviewRepository>,
    lifecycle: InterviewLifecycle,
    planner: SlotPlanner,
}

impl InterviewService {
    pub fn new(
        repository: Arc<dyn InterviewRepository>,
        lifecycle: InterviewLifecycle,
        planner: SlotPlanner,
    ) -> Self {
        Self {
            repository,
            lifecycle,
            planner,
        }
    }

    pub fn policy(&self) -> TransitionPolicy {
        self.lifecycle.policy()
    }

    pub fn create(&self, payload: CreateInterviewPayload) -> Result<Interview> {
        let interview = Interview::new(
            payload.candidate_id,
            payload.job_id,
            payload.stage,
            payload.interviewers,
            payload.duration_minutes,
            payload.mode.unwrap_or_default(),
        );
        self.repository.insert(interview.clone())?;
        tracing::info!(
            interview_id = %interview.id,
            candidate_id = %interview.candidate_id,
            job_id = %interview.job_id,
            "Interview created"
        );
        Ok(interview)
    }

    pub fn get(&self, id: Uuid) -> Result<Interview> {
        self.repository
            .get(id)?
            .ok_or_else(|| Error::NotFound("Interview not found".into()))
    }

    pub fn list(&self, query: InterviewListQuery) -> Result<InterviewList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);

        let matching: Vec<Interview> = self
            .repository
            .list()?
            .into_iter()
            .filter(|i| query.state.map_or(true, |s| i.current_state() == s))
            .collect();
        let total = matching.len();
        let total_pages = total.div_ceil(per_page);
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(per_page))
            .take(per_page)
            .collect();

        Ok(InterviewList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Interviews per state, in declaration order, zeros included.
    pub fn state_counts(&self) -> Result<Vec<(InterviewState, usize)>> {
        let interviews = self.repository.list()?;
        Ok(InterviewState::ALL
            .into_iter()
            .map(|state| {
                let count = interviews
                    .iter()
                    .filter(|i| i.current_state() == state)
                    .count();
                (state, count)
            })
            .collect())
    }

    /// Active interviews per interviewer, busiest first.
    pub fn panelist_load(&self) -> Result<Vec<(String, usize)>> {
        let mut load: BTreeMap<String, usize> = BTreeMap::new();
        for interview in self.repository.list()? {
            if !interview.current_state().is_active() {
                continue;
            }
            for name in &interview.interviewers {
                *load.entry(name.clone()).or_default() += 1;
            }
        }
        let mut items: Vec<(String, usize)> = load.into_iter().collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(items)
    }

    pub fn transition(
        &self,
        id: Uuid,
        request: TransitionRequest,
    ) -> Result<(Interview, StateTransitionEvent)> {
        let mut interview = self.get(id)?;
        if let Some(expected) = request.expected_state {
            let current = interview.current_state();
            if current != expected {
                return Err(Error::Conflict(format!(
                    "Interview is in state {}, expected {}",
                    current, expected
                )));
            }
        }

        let version = interview.version();
        let event = self
            .lifecycle
            .apply(
                &mut interview,
                request.state,
                request.triggered_by,
                request.metadata,
            )?
            .clone();
        self.commit(interview, version, event)
    }

    /// Proposes slots for the panel and moves the interview to `slots_generated`.
    pub fn generate_slots(&self, id: Uuid) -> Result<(Interview, Vec<RankedSlot>)> {
        let mut interview = self.get(id)?;
        let version = interview.version();
        let (busy, load) = self.panel_commitments(&interview)?;

        let ranked = self.planner.plan(&interview, now(), &busy, &load);
        if ranked.is_empty() {
            return Err(Error::Conflict(
                "No available slots within the planning horizon".into(),
            ));
        }

        interview.set_proposed_slots(ranked.iter().map(|r| r.slot).collect());
        let mut metadata = EventMetadata::new();
        metadata.insert("slot_count".into(), json!(ranked.len()));
        let event = self
            .lifecycle
            .apply(
                &mut interview,
                InterviewState::SlotsGenerated,
                TriggeredBy::System,
                Some(metadata),
            )?
            .clone();

        let (interview, _) = self.commit(interview, version, event)?;
        Ok((interview, ranked))
    }

    pub fn confirm_slot(
        &self,
        id: Uuid,
        slot: TimeSlot,
        triggered_by: TriggeredBy,
    ) -> Result<(Interview, StateTransitionEvent)> {
        let mut interview = self.get(id)?;
        if !interview.proposed_slots().contains(&slot) {
            return Err(Error::BadRequest(
                "Slot is not one of the proposed slots".into(),
            ));
        }

        let version = interview.version();
        interview.set_confirmed_slot(slot);
        let mut metadata = EventMetadata::new();
        metadata.insert("start".into(), json!(slot.start));
        metadata.insert("end".into(), json!(slot.end));
        let event = self
            .lifecycle
            .apply(
                &mut interview,
                InterviewState::SlotConfirmed,
                triggered_by,
                Some(metadata),
            )?
            .clone();
        self.commit(interview, version, event)
    }

    fn commit(
        &self,
        interview: Interview,
        expected_version: u64,
        event: StateTransitionEvent,
    ) -> Result<(Interview, StateTransitionEvent)> {
        self.repository.save(interview.clone(), expected_version)?;
        self.lifecycle.notify(&interview, &event);
        Ok((interview, event))
    }

    /// Confirmed slots of other active interviews sharing a panelist.
    ///
    /// A `no_show` or `rescheduled` interview no longer holds its old booking.
    fn panel_commitments(&self, interview: &Interview) -> Result<(Vec<TimeSlot>, DayLoad)> {
        let mut busy = Vec::new();
        let mut load = DayLoad::new();
        for other in self.repository.list()? {
            let state = other.current_state();
            if other.id == interview.id || !state.is_active() || state.is_branch() {
                continue;
            }
            let Some(slot) = other.confirmed_slot() else {
                continue;
            };
            let shared: Vec<&String> = other
                .interviewers
                .iter()
                .filter(|name| interview.interviewers.contains(name))
                .collect();
            if shared.is_empty() {
                continue;
            }
            busy.push(*slot);
            for name in shared {
                *load
                    .entry((name.clone(), slot.start.date_naive()))
                    .or_default() += 1;
            }
        }
        Ok((busy, load))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::MockStateChangeListener;
    use crate::models::interview::InterviewMode;
    use crate::services::availability_service::{
        LoadAwareRanker, MockAvailabilityProvider, WorkingHoursProvider,
    };
    use crate::services::repository::{InMemoryInterviewRepository, MockInterviewRepository};
    use chrono::Duration;

    fn planner() -> SlotPlanner {
        SlotPlanner::new(
            Arc::new(WorkingHoursProvider::new(9, 17)),
            Arc::new(LoadAwareRanker),
            5,
        )
    }

    fn service(policy: TransitionPolicy) -> InterviewService {
        InterviewService::new(
            Arc::new(InMemoryInterviewRepository::new()),
            InterviewLifecycle::new(policy),
            planner(),
        )
    }

    fn payload(interviewers: &[&str]) -> CreateInterviewPayload {
        CreateInterviewPayload {
            candidate_id: "cand-1".into(),
            job_id: "job-1".into(),
            stage: "Technical".into(),
            interviewers: interviewers.iter().map(|s| s.to_string()).collect(),
            duration_minutes: 60,
            mode: None,
        }
    }

    #[test]
    fn create_then_transition_persists_state() {
        let svc = service(TransitionPolicy::Strict);
        let created = svc.create(payload(&["alice"])).unwrap();
        assert_eq!(created.mode, InterviewMode::Video);

        let (updated, event) = svc
            .transition(
                created.id,
                TransitionRequest::new(InterviewState::SlotsGenerated, TriggeredBy::System),
            )
            .unwrap();

        assert_eq!(updated.current_state(), InterviewState::SlotsGenerated);
        assert_eq!(event.state, InterviewState::SlotsGenerated);
        let stored = svc.get(created.id).unwrap();
        assert_eq!(stored.state_history().len(), 1);
    }

    #[test]
    fn illegal_transition_leaves_store_untouched() {
        let svc = service(TransitionPolicy::Strict);
        let created = svc.create(payload(&["alice"])).unwrap();

        let err = svc
            .transition(
                created.id,
                TransitionRequest::new(InterviewState::Closed, TriggeredBy::Recruiter),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Transition(_)));
        assert_eq!(svc.get(created.id).unwrap().version(), 0);
    }

    #[test]
    fn expected_state_mismatch_is_a_conflict() {
        let svc = service(TransitionPolicy::Lenient);
        let created = svc.create(payload(&["alice"])).unwrap();
        let mut request = TransitionRequest::new(InterviewState::Notified, TriggeredBy::Recruiter);
        request.expected_state = Some(InterviewState::SlotConfirmed);

        let err = svc.transition(created.id, request).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn unknown_interview_is_not_found() {
        let svc = service(TransitionPolicy::Strict);
        let err = svc
            .transition(
                Uuid::new_v4(),
                TransitionRequest::new(InterviewState::SlotsGenerated, TriggeredBy::System),
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn listener_runs_only_after_save_succeeds() {
        let interview =
            Interview::new("c", "j", "s", vec!["alice".into()], 30, InterviewMode::Phone);
        let id = interview.id;

        let mut repo = MockInterviewRepository::new();
        let stored = interview.clone();
        repo.expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        repo.expect_save()
            .times(1)
            .returning(|_, _| Err(Error::Conflict("stale".into())));

        let mut listener = MockStateChangeListener::new();
        listener.expect_on_state_change().times(0);

        let svc = InterviewService::new(
            Arc::new(repo),
            InterviewLifecycle::new(TransitionPolicy::Strict).with_listener(Arc::new(listener)),
            planner(),
        );
        let err = svc
            .transition(
                id,
                TransitionRequest::new(InterviewState::SlotsGenerated, TriggeredBy::System),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn list_filters_by_state_and_paginates() {
        let svc = service(TransitionPolicy::Strict);
        for _ in 0..5 {
            svc.create(payload(&["alice"])).unwrap();
        }
        let moved = svc.create(payload(&["bob"])).unwrap();
        svc.transition(
            moved.id,
            TransitionRequest::new(InterviewState::SlotsGenerated, TriggeredBy::System),
        )
        .unwrap();

        let page = svc
            .list(InterviewListQuery {
                state: Some(InterviewState::Created),
                page: Some(2),
                per_page: Some(2),
            })
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);

        let generated = svc
            .list(InterviewListQuery {
                state: Some(InterviewState::SlotsGenerated),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(generated.total, 1);
        assert_eq!(generated.items[0].id, moved.id);
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let svc = service(TransitionPolicy::Strict);
        for _ in 0..3 {
            svc.create(payload(&["alice"])).unwrap();
        }

        let page = svc
            .list(InterviewListQuery {
                state: None,
                page: Some(usize::MAX),
                per_page: Some(100),
            })
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.page, usize::MAX);
        assert!(page.items.is_empty());

        let wrapping = svc
            .list(InterviewListQuery {
                state: None,
                page: Some(usize::MAX / 2 + 2),
                per_page: Some(2),
            })
            .unwrap();
        assert!(wrapping.items.is_empty());
    }

    #[test]
    fn counts_and_load_reflect_active_interviews() {
        let svc = service(TransitionPolicy::Lenient);
        svc.create(payload(&["alice", "bob"])).unwrap();
        svc.create(payload(&["alice"])).unwrap();
        let done = svc.create(payload(&["bob"])).unwrap();
        svc.transition(
            done.id,
            TransitionRequest::new(InterviewState::Closed, TriggeredBy::Recruiter),
        )
        .unwrap();

        let counts = svc.state_counts().unwrap();
        assert_eq!(counts.len(), InterviewState::ALL.len());
        assert!(counts.contains(&(InterviewState::Created, 2)));
        assert!(counts.contains(&(InterviewState::Closed, 1)));

        let load = svc.panelist_load().unwrap();
        assert_eq!(load, vec![("alice".to_string(), 2), ("bob".to_string(), 1)]);
    }

    #[test]
    fn slots_are_generated_then_confirmed() {
        let svc = service(TransitionPolicy::Strict);
        let created = svc.create(payload(&["alice"])).unwrap();

        let (interview, slots) = svc.generate_slots(created.id).unwrap();
        assert_eq!(interview.current_state(), InterviewState::SlotsGenerated);
        assert!(!slots.is_empty() && slots.len() <= 5);
        assert_eq!(interview.proposed_slots().len(), slots.len());

        let chosen = slots[0].slot;
        let (interview, event) = svc
            .confirm_slot(created.id, chosen, TriggeredBy::Candidate)
            .unwrap();
        assert_eq!(interview.current_state(), InterviewState::SlotConfirmed);
        assert_eq!(interview.confirmed_slot(), Some(&chosen));
        assert_eq!(event.triggered_by, TriggeredBy::Candidate);
        assert!(event.metadata.unwrap().contains_key("start"));
    }

    #[test]
    fn confirming_an_unknown_slot_is_rejected() {
        let svc = service(TransitionPolicy::Strict);
        let created = svc.create(payload(&["alice"])).unwrap();
        svc.generate_slots(created.id).unwrap();

        let start = now() + Duration::days(30);
        let err = svc
            .confirm_slot(
                created.id,
                TimeSlot::new(start, start + Duration::minutes(60)),
                TriggeredBy::Candidate,
            )
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn no_free_time_is_a_conflict() {
        let mut provider = MockAvailabilityProvider::new();
        provider.expect_free_windows().returning(|_, _, _| Vec::new());
        let svc = InterviewService::new(
            Arc::new(InMemoryInterviewRepository::new()),
            InterviewLifecycle::new(TransitionPolicy::Strict),
            SlotPlanner::new(Arc::new(provider), Arc::new(LoadAwareRanker), 5),
        );
        let created = svc.create(payload(&["alice"])).unwrap();

        let err = svc.generate_slots(created.id).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(svc.get(created.id).unwrap().current_state(), InterviewState::Created);
    }

    #[test]
    fn confirmed_slots_block_shared_panelists() {
        let svc = service(TransitionPolicy::Strict);
        let first = svc.create(payload(&["alice"])).unwrap();
        let (_, slots) = svc.generate_slots(first.id).unwrap();
        let taken = slots[0].slot;
        svc.confirm_slot(first.id, taken, TriggeredBy::Recruiter).unwrap();

        let second = svc.create(payload(&["alice", "bob"])).unwrap();
        let (_, proposed) = svc.generate_slots(second.id).unwrap();
        assert!(proposed.iter().all(|r| !r.slot.overlaps(&taken)));
    }

    #[test]
    fn rescheduled_interviews_release_their_booking() {
        let svc = service(TransitionPolicy::Strict);
        let first = svc.create(payload(&["alice"])).unwrap();
        let (_, slots) = svc.generate_slots(first.id).unwrap();
        let taken = slots[0].slot;
        svc.confirm_slot(first.id, taken, TriggeredBy::Recruiter).unwrap();
        svc.transition(
            first.id,
            TransitionRequest::new(InterviewState::Rescheduled, TriggeredBy::Candidate),
        )
        .unwrap();

        let second = svc.create(payload(&["alice"])).unwrap();
        let (_, proposed) = svc.generate_slots(second.id).unwrap();
        assert!(proposed.iter().any(|r| r.slot == taken));
    }
}
