pub mod config;
pub mod dto;
pub mod error;
pub mod lifecycle;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::lifecycle::InterviewLifecycle;
use crate::services::{
    availability_service::{LoadAwareRanker, SlotPlanner, WorkingHoursProvider},
    interview_service::InterviewService,
    notification_service::{TracingListener, WebhookNotifier},
    repository::InMemoryInterviewRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub webhook_secret: String,
    pub interview_service: InterviewService,
    pub webhook_notifier: Option<WebhookNotifier>,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let webhook_notifier = config
            .state_webhook_url
            .clone()
            .map(|url| WebhookNotifier::new(url, config.webhook_secret.clone()));

        let mut lifecycle =
            InterviewLifecycle::new(config.transition_policy).with_listener(Arc::new(TracingListener));
        if let Some(notifier) = &webhook_notifier {
            lifecycle = lifecycle.with_listener(Arc::new(notifier.clone()));
        }

        let planner = SlotPlanner::new(
            Arc::new(WorkingHoursProvider::new(
                config.workday_start_hour,
                config.workday_end_hour,
            )),
            Arc::new(LoadAwareRanker),
            config.slot_suggestion_count,
        );
        let interview_service = InterviewService::new(
            Arc::new(InMemoryInterviewRepository::new()),
            lifecycle,
            planner,
        );

        Self {
            webhook_secret: config.webhook_secret.clone(),
            interview_service,
            webhook_notifier,
        }
    }
}
