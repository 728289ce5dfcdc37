use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};

use crate::models::interview::Interview;
use crate::models::slot::{RankedSlot, TimeSlot};
use crate::utils::time::ceil_to_minutes;

const GRID_MINUTES: i64 = 30;
const HORIZON_DAYS: i64 = 7;

/// Interviews already booked per interviewer per day.
pub type DayLoad = HashMap<(String, NaiveDate), usize>;

/// Source of free calendar time for a panel.
#[cfg_attr(test, mockall::automock)]
pub trait AvailabilityProvider: Send + Sync {
    fn free_windows(
        &self,
        interviewers: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<TimeSlot>;
}

/// Orders candidate slots, best first.
pub trait SlotRanker: Send + Sync {
    fn rank(&self, slots: Vec<TimeSlot>, interviewers: &[String], load: &DayLoad)
        -> Vec<RankedSlot>;
}

/// Every weekday between `start_hour` and `end_hour` (UTC) counts as free.
#[derive(Debug, Clone, Copy)]
pub struct WorkingHoursProvider {
    start_hour: u32,
    end_hour: u32,
}

impl WorkingHoursProvider {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }
}

fn at_hour(date: NaiveDate, hour: u32) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)) + Duration::hours(hour as i64)
}

impl AvailabilityProvider for WorkingHoursProvider {
    fn free_windows(
        &self,
        _interviewers: &[String],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<TimeSlot> {
        let mut windows = Vec::new();
        let mut day = from.date_naive();
        while day <= to.date_naive() {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                let start = at_hour(day, self.start_hour).max(from);
                let end = at_hour(day, self.end_hour).min(to);
                let window = TimeSlot::new(start, end);
                if !window.is_empty() {
                    windows.push(window);
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        windows
    }
}

/// Prefers days where the panel is lightly booked, then earlier slots.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadAwareRanker;

impl SlotRanker for LoadAwareRanker {
    fn rank(
        &self,
        slots: Vec<TimeSlot>,
        interviewers: &[String],
        load: &DayLoad,
    ) -> Vec<RankedSlot> {
        let Some(earliest) = slots.iter().map(|s| s.start).min() else {
            return Vec::new();
        };

        let mut ranked: Vec<RankedSlot> = slots
            .into_iter()
            .map(|slot| {
                let day = slot.start.date_naive();
                let booked: usize = interviewers
                    .iter()
                    .map(|name| load.get(&(name.clone(), day)).copied().unwrap_or(0))
                    .sum();
                let days_out = (slot.start - earliest).num_minutes() as f64 / (24.0 * 60.0);
                RankedSlot {
                    slot,
                    score: 100.0 - 10.0 * booked as f64 - days_out,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.slot.start.cmp(&b.slot.start))
        });
        ranked
    }
}

/// Turns free windows into a short list of ranked interview slots.
#[derive(Clone)]
pub struct SlotPlanner {
    provider: Arc<dyn AvailabilityProvider>,
    ranker: Arc<dyn SlotRanker>,
    suggestion_count: usize,
}

impl SlotPlanner {
    pub fn new(
        provider: Arc<dyn AvailabilityProvider>,
        ranker: Arc<dyn SlotRanker>,
        suggestion_count: usize,
    ) -> Self {
        Self {
            provider,
            ranker,
            suggestion_count,
        }
    }

    /// `busy` holds slots the panel already committed to; candidates
    /// overlapping any of them are dropped.
    pub fn plan(
        &self,
        interview: &Interview,
        from: DateTime<Utc>,
        busy: &[TimeSlot],
        load: &DayLoad,
    ) -> Vec<RankedSlot> {
        let length = Duration::minutes(interview.duration_minutes as i64);
        let to = from + Duration::days(HORIZON_DAYS);

        let mut candidates = Vec::new();
        for window in self.provider.free_windows(&interview.interviewers, from, to) {
            let mut start = ceil_to_minutes(window.start, GRID_MINUTES);
            while start + length <= window.end {
                let slot = TimeSlot::new(start, start + length);
                if !busy.iter().any(|b| b.overlaps(&slot)) {
                    candidates.push(slot);
                }
                start += Duration::minutes(GRID_MINUTES);
            }
        }

        tracing::debug!(
            interview_id = %interview.id,
            candidates = candidates.len(),
            "Ranking candidate slots"
        );

        let mut ranked = self.ranker.rank(candidates, &interview.interviewers, load);
        ranked.truncate(self.suggestion_count);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::interview::InterviewMode;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn panel_interview(duration: u32) -> Interview {
        Interview::new(
            "cand",
            "job",
            "Panel",
            vec!["alice".into(), "bob".into()],
            duration,
            InterviewMode::Video,
        )
    }

    #[test]
    fn working_hours_skip_weekends_and_clip_to_range() {
        let provider = WorkingHoursProvider::new(9, 17);
        // Friday 2026-10-16 10:15 through Monday 2026-10-19 12:00
        let windows = provider.free_windows(&[], utc(2026, 10, 16, 10, 15), utc(2026, 10, 19, 12, 0));

        assert_eq!(
            windows,
            vec![
                TimeSlot::new(utc(2026, 10, 16, 10, 15), utc(2026, 10, 16, 17, 0)),
                TimeSlot::new(utc(2026, 10, 19, 9, 0), utc(2026, 10, 19, 12, 0)),
            ]
        );
    }

    #[test]
    fn ranker_prefers_lightly_loaded_days() {
        let monday = TimeSlot::new(utc(2026, 10, 19, 9, 0), utc(2026, 10, 19, 10, 0));
        let tuesday = TimeSlot::new(utc(2026, 10, 20, 9, 0), utc(2026, 10, 20, 10, 0));
        let mut load = DayLoad::new();
        load.insert(("alice".to_string(), monday.start.date_naive()), 2);

        let ranked = LoadAwareRanker.rank(
            vec![monday, tuesday],
            &["alice".to_string(), "bob".to_string()],
            &load,
        );

        assert_eq!(ranked[0].slot, tuesday);
        assert_eq!(ranked[1].slot, monday);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn ranker_breaks_ties_by_start_time() {
        let early = TimeSlot::new(utc(2026, 10, 19, 9, 0), utc(2026, 10, 19, 9, 30));
        let late = TimeSlot::new(utc(2026, 10, 19, 9, 30), utc(2026, 10, 19, 10, 0));
        let ranked = LoadAwareRanker.rank(vec![late, early], &[], &DayLoad::new());
        assert_eq!(ranked[0].slot, early);
    }

    #[test]
    fn planner_skips_slots_overlapping_busy_time() {
        let mut provider = MockAvailabilityProvider::new();
        provider.expect_free_windows().returning(|_, _, _| {
            vec![TimeSlot::new(utc(2026, 10, 19, 9, 0), utc(2026, 10, 19, 12, 0))]
        });
        let planner = SlotPlanner::new(Arc::new(provider), Arc::new(LoadAwareRanker), 3);
        let busy = [TimeSlot::new(utc(2026, 10, 19, 9, 30), utc(2026, 10, 19, 10, 30))];

        let slots = planner.plan(&panel_interview(60), utc(2026, 10, 19, 8, 0), &busy, &DayLoad::new());

        let starts: Vec<_> = slots.iter().map(|s| s.slot.start).collect();
        assert_eq!(
            starts,
            vec![
                utc(2026, 10, 19, 10, 30),
                utc(2026, 10, 19, 11, 0),
            ]
        );
        assert!(slots.iter().all(|s| s.slot.duration() == Duration::minutes(60)));
    }

    #[test]
    fn planner_returns_nothing_without_windows() {
        let mut provider = MockAvailabilityProvider::new();
        provider.expect_free_windows().returning(|_, _, _| Vec::new());
        let planner = SlotPlanner::new(Arc::new(provider), Arc::new(LoadAwareRanker), 5);

        let slots = planner.plan(&panel_interview(45), utc(2026, 10, 19, 8, 0), &[], &DayLoad::new());
        assert!(slots.is_empty());
    }
}
