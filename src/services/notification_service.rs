use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::lifecycle::{next_canonical_state, progress_ratio, StateChangeListener};
use crate::models::interview::{Interview, InterviewState, StateTransitionEvent};
use crate::utils::crypto::sign_payload;
use crate::utils::time::{now, to_rfc3339};

pub const STATE_CHANGED_EVENT: &str = "interview.state_changed";
const MAX_ATTEMPTS: u32 = 3;

/// Writes every transition to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl StateChangeListener for TracingListener {
    fn on_state_change(&self, interview: &Interview, event: &StateTransitionEvent) {
        tracing::info!(
            interview_id = %interview.id,
            candidate_id = %interview.candidate_id,
            state = %event.state,
            triggered_by = %event.triggered_by,
            version = interview.version(),
            "Interview state changed"
        );
    }
}

pub fn state_changed_payload(interview: &Interview, event: &StateTransitionEvent) -> JsonValue {
    let history = interview.state_history();
    let previous_state = history
        .len()
        .checked_sub(2)
        .map(|idx| history[idx].state)
        .unwrap_or(InterviewState::Created);

    json!({
        "event": STATE_CHANGED_EVENT,
        "interview_id": interview.id,
        "candidate_id": interview.candidate_id,
        "job_id": interview.job_id,
        "stage": interview.stage,
        "previous_state": previous_state,
        "state": event.state,
        "triggered_by": event.triggered_by,
        "timestamp": to_rfc3339(event.timestamp),
        "metadata": event.metadata,
        "progress": progress_ratio(event.state),
        "next_state": next_canonical_state(event.state),
        "terminal": event.state.is_terminal(),
    })
}

#[derive(Debug, Clone)]
struct OutboxEntry {
    id: Uuid,
    payload: JsonValue,
    attempts: u32,
    next_attempt_at: DateTime<Utc>,
}

/// Retry delay after `attempts` failed deliveries.
pub fn backoff(attempts: u32) -> Duration {
    let exp = attempts.saturating_sub(1).min(16);
    Duration::seconds((30_i64 << exp).min(3600))
}

/// Forwards transitions to an external URL.
///
/// Transitions are queued in memory from the synchronous callback and sent by
/// [`WebhookNotifier::run_once`], which `main` drives from a background task.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    target_url: String,
    secret: String,
    outbox: Arc<Mutex<VecDeque<OutboxEntry>>>,
}

impl WebhookNotifier {
    pub fn new(target_url: String, secret: String) -> Self {
        Self {
            client: Client::new(),
            target_url,
            secret,
            outbox: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn enqueue(&self, payload: JsonValue) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| Error::Internal("webhook outbox lock poisoned".into()))?;
        outbox.push_back(OutboxEntry {
            id,
            payload,
            attempts: 0,
            next_attempt_at: now(),
        });
        Ok(id)
    }

    pub fn pending(&self) -> usize {
        self.outbox.lock().map(|o| o.len()).unwrap_or(0)
    }

    fn take_due(&self) -> Result<Option<OutboxEntry>> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| Error::Internal("webhook outbox lock poisoned".into()))?;
        let current = now();
        let Some(idx) = outbox.iter().position(|e| e.next_attempt_at <= current) else {
            return Ok(None);
        };
        Ok(outbox.remove(idx))
    }

    fn requeue(&self, entry: OutboxEntry) -> Result<()> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| Error::Internal("webhook outbox lock poisoned".into()))?;
        outbox.push_back(entry);
        Ok(())
    }

    async fn deliver(&self, payload: &JsonValue) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        let signature = sign_payload(&self.secret, &body)?;
        let resp = self
            .client
            .post(&self.target_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header("X-Webhook-Secret", self.secret.as_str())
            .header("X-Signature", signature)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(Error::Internal(format!(
                "webhook responded with {}: {}",
                status, text
            )))
        }
    }

    /// Sends the oldest due entry. Returns `Ok(false)` when nothing was due.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(mut entry) = self.take_due()? else {
            return Ok(false);
        };

        match self.deliver(&entry.payload).await {
            Ok(()) => {
                tracing::debug!(delivery_id = %entry.id, "State webhook delivered");
            }
            Err(err) => {
                entry.attempts += 1;
                if entry.attempts < MAX_ATTEMPTS {
                    entry.next_attempt_at = now() + backoff(entry.attempts);
                    tracing::warn!(
                        delivery_id = %entry.id,
                        attempts = entry.attempts,
                        error = %err,
                        "State webhook failed, retry scheduled"
                    );
                    self.requeue(entry)?;
                } else {
                    tracing::error!(
                        delivery_id = %entry.id,
                        attempts = entry.attempts,
                        error = %err,
                        "State webhook dropped after max attempts"
                    );
                }
            }
        }
        Ok(true)
    }
}

impl StateChangeListener for WebhookNotifier {
    fn on_state_change(&self, interview: &Interview, event: &StateTransitionEvent) {
        if let Err(err) = self.enqueue(state_changed_payload(interview, event)) {
            tracing::error!(interview_id = %interview.id, error = %err, "Could not queue state webhook");
        }
    }
}
