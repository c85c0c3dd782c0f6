//! Route table (§6 HTTP/JSON surface), grouped by resource under `/api`
//! the way the teacher's `api/routes.rs` builds one `Router` out of flat
//! `.route(...)` calls rather than nested sub-routers per resource.

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers;
use super::AppState;

pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/scenarios/generate", post(handlers::generate_scenario))
        .route("/scenarios", get(handlers::list_scenarios))
        .route("/scenarios/:id", get(handlers::get_scenario))
        .route("/scenarios/:id", delete(handlers::delete_scenario))
        .route("/scenarios/:id/simulation/start", post(handlers::start_simulation))
        .route("/scenarios/:id/simulation/pause", post(handlers::pause_simulation))
        .route("/scenarios/:id/simulation/resume", post(handlers::resume_simulation))
        .route("/scenarios/:id/simulation/stop", post(handlers::stop_simulation))
        .route("/scenarios/:id/simulation/seek", post(handlers::seek_simulation))
        .route("/scenarios/:id/simulation/speed", post(handlers::set_speed))
        .route("/scenarios/:id/events", get(handlers::list_events))
        .route("/scenarios/:id/decisions", get(handlers::list_decisions))
        .route("/scenarios/:id/ingest", post(handlers::ingest_document))
        .with_state(state)
}
