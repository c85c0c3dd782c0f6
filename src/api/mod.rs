//! HTTP/JSON surface (§6) — the thin boundary over `AppState`. Out of
//! scope per spec.md §1 ("HTTP route handlers" are an external
//! collaborator the core doesn't depend on); these handlers exist so the
//! crate is a runnable server, grouped by resource the way the teacher's
//! `api/routes.rs` groups `api_routes`, with `tower_http::trace`/`cors`
//! layers as `api/setup.rs::build_router` demonstrates.

pub mod envelope;
pub mod handlers;
pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::broadcast::BroadcastAdapter;
use crate::catalog::SatelliteCatalog;
use crate::engine::SimulationController;
use crate::llm::client::LlmClient;
use crate::persistence::PersistenceLayer;

/// Shared application state, the axum handlers' one dependency — mirrors
/// the teacher's `Arc<RwLock<AppState>>` composition root in `main.rs`,
/// except each collaborator here is independently `Arc`'d since the
/// handlers only ever read through trait objects or the controller's own
/// interior locking, never the whole struct.
#[derive(Clone)]
pub struct AppState {
    pub persistence: Arc<dyn PersistenceLayer>,
    pub broadcast: Arc<BroadcastAdapter>,
    pub controller: Arc<SimulationController>,
    pub llm_client: Arc<dyn LlmClient>,
    pub satellite_catalog: Arc<dyn SatelliteCatalog>,
}

/// Build the full axum router: health probe at root, the resource routes
/// under `/api`, and a WebSocket upgrade endpoint for room join/leave.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = if cors_origin == "*" {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(cors_origin.parse::<axum::http::HeaderValue>().expect("invalid CORS_ORIGIN"))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let ws_router = Router::new()
        .route("/ws", axum::routing::get(ws::ws_handler))
        .with_state(state.clone());

    Router::new()
        .route("/health", axum::routing::get(handlers::health))
        .with_state(state.clone())
        .nest("/api", routes::api_routes(state))
        .merge(ws_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
