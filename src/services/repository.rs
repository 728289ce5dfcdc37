use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::interview::Interview;

/// Storage for interview aggregates.
///
/// `save` is a compare-and-swap on [`Interview::version`]: it only succeeds
/// while the stored copy still has `expected_version`, so two writers that
/// loaded the same version cannot both land a transition.
#[cfg_attr(test, mockall::automock)]
pub trait InterviewRepository: Send + Sync {
    fn insert(&self, interview: Interview) -> Result<()>;
    fn get(&self, id: Uuid) -> Result<Option<Interview>>;
    fn list(&self) -> Result<Vec<Interview>>;
    fn save(&self, interview: Interview, expected_version: u64) -> Result<()>;
}

#[derive(Clone, Default)]
pub struct InMemoryInterviewRepository {
    interviews: Arc<RwLock<HashMap<Uuid, Interview>>>,
}

impl InMemoryInterviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::Internal("interview store lock poisoned".to_string())
}

impl InterviewRepository for InMemoryInterviewRepository {
    fn insert(&self, interview: Interview) -> Result<()> {
        let mut guard = self.interviews.write().map_err(poisoned)?;
        if guard.contains_key(&interview.id) {
            return Err(Error::Conflict(format!(
                "Interview {} already exists",
                interview.id
            )));
        }
        guard.insert(interview.id, interview);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Interview>> {
        let guard = self.interviews.read().map_err(poisoned)?;
        Ok(guard.get(&id).cloned())
    }

    fn list(&self) -> Result<Vec<Interview>> {
        let guard = self.interviews.read().map_err(poisoned)?;
        let mut items: Vec<Interview> = guard.values().cloned().collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(items)
    }

    fn save(&self, interview: Interview, expected_version: u64) -> Result<()> {
        let mut guard = self.interviews.write().map_err(poisoned)?;
        let stored = guard
            .get_mut(&interview.id)
            .ok_or_else(|| Error::NotFound("Interview not found".into()))?;
        if stored.version() != expected_version {
            return Err(Error::Conflict(format!(
                "Interview {} was modified concurrently (expected version {}, found {})",
                interview.id,
                expected_version,
                stored.version()
            )));
        }
        *stored = interview;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{InterviewLifecycle, TransitionPolicy};
    use crate::models::interview::{InterviewMode, InterviewState, TriggeredBy};

    fn sample() -> Interview {
        Interview::new("cand", "job", "Screen", vec!["dana".into()], 30, InterviewMode::Phone)
    }

    #[test]
    fn insert_then_get_returns_copy() {
        let repo = InMemoryInterviewRepository::new();
        let interview = sample();
        let id = interview.id;
        repo.insert(interview).unwrap();

        let loaded = repo.get(id).unwrap().unwrap();
        assert_eq!(loaded.id, id);
        assert!(repo.get(Uuid::new_v4()).unwrap().is_none());
        assert!(matches!(repo.insert(loaded), Err(Error::Conflict(_))));
    }

    #[test]
    fn stale_save_is_rejected() {
        let repo = InMemoryInterviewRepository::new();
        let lifecycle = InterviewLifecycle::new(TransitionPolicy::Strict);
        let interview = sample();
        let id = interview.id;
        repo.insert(interview).unwrap();

        let mut first = repo.get(id).unwrap().unwrap();
        let mut second = repo.get(id).unwrap().unwrap();
        lifecycle
            .apply(&mut first, InterviewState::SlotsGenerated, TriggeredBy::System, None)
            .unwrap();
        lifecycle
            .apply(&mut second, InterviewState::SlotsGenerated, TriggeredBy::Recruiter, None)
            .unwrap();

        repo.save(first, 0).unwrap();
        let err = repo.save(second, 0).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let stored = repo.get(id).unwrap().unwrap();
        assert_eq!(stored.version(), 1);
        assert_eq!(stored.last_event().unwrap().triggered_by, TriggeredBy::System);
    }

    #[test]
    fn save_unknown_interview_is_not_found() {
        let repo = InMemoryInterviewRepository::new();
        assert!(matches!(repo.save(sample(), 0), Err(Error::NotFound(_))));
    }
}
