pub mod health;
pub mod interview;
pub mod webhook;

use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;

use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::openapi::ApiDoc;
use crate::AppState;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// All routes with state applied; `rps` limits the `/api` routes.
pub fn router(state: AppState, rps: u32) -> Router {
    let api = Router::new()
        .route(
            "/api/interviews",
            get(interview::list_interviews).post(interview::create_interview),
        )
        .route("/api/interviews/stats", get(interview::interview_stats))
        .route("/api/interviews/:id", get(interview::get_interview))
        .route("/api/interviews/:id/history", get(interview::get_history))
        .route(
            "/api/interviews/:id/transition",
            post(interview::transition_interview),
        )
        .route(
            "/api/interviews/:id/slots/generate",
            post(interview::generate_slots),
        )
        .route(
            "/api/interviews/:id/slots/confirm",
            post(interview::confirm_slot),
        )
        .route("/api/panelists/load", get(interview::panelist_load))
        .route("/api/webhook/ats", post(webhook::handle_ats_event))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(rps),
            rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(api)
        .with_state(state)
}
