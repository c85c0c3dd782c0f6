//! Handlers (§6 HTTP/JSON surface) — thin functions over `AppState`,
//! grouped by resource the way the teacher's `handlers.rs` groups dashboard
//! endpoints, each building its envelope through `super::envelope` rather
//! than hand-assembling JSON.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::engine::EngineError;
use crate::ingest::{self, IngestError};
use crate::persistence::PersistenceError;
use crate::scenario_generator;
use crate::types::*;

use super::envelope::{self, Envelope};
use super::AppState;

fn map_persistence_err(err: PersistenceError) -> Response {
    match err {
        PersistenceError::NotFound => envelope::not_found(err.to_string()),
        PersistenceError::ForeignKeyViolation(_) => envelope::conflict(err.to_string()),
        PersistenceError::Storage(_) => envelope::internal(err.to_string()),
    }
}

fn map_engine_err(err: EngineError) -> Response {
    match err {
        EngineError::Persistence(e) => map_persistence_err(e),
        EngineError::AlreadyRunning(id) => {
            envelope::conflict(format!("scenario {id} is already running"))
        }
        EngineError::NotRunning(id) => envelope::conflict(format!("scenario {id} is not running")),
    }
}

// ---- Scenarios ----------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateScenarioRequest {
    pub name: String,
    pub theater: Option<String>,
    pub adversary: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct GenerateScenarioResponse {
    pub id: ScenarioId,
    pub name: String,
    pub generation_status: GenerationStatus,
}

/// `POST /api/scenarios/generate` (§6): 400 on a blank name, else 202 with
/// the freshly-created scenario and generation kicked off in the
/// background — the handler never awaits the full generation run.
pub async fn generate_scenario(
    State(state): State<AppState>,
    Json(req): Json<GenerateScenarioRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return envelope::bad_request("name is required");
    }

    let now = Utc::now();
    let scenario = Scenario {
        id: ScenarioId::new(),
        name: req.name.clone(),
        theater: req.theater.unwrap_or_else(|| "Unspecified".to_string()),
        adversary: req.adversary.unwrap_or_else(|| "Unspecified".to_string()),
        start_date: req.start_date.unwrap_or(now),
        end_date: req.end_date.unwrap_or(now + chrono::Duration::days(14)),
        generation_status: GenerationStatus::Generating,
        generation_step: None,
        generation_progress: 0,
        generation_error: None,
    };

    if let Err(err) = state.persistence.create_scenario(&scenario).await {
        return map_persistence_err(err);
    }

    let scenario_id = scenario.id;
    let persistence = state.persistence.clone();
    let broadcast = state.broadcast.clone();
    let llm_client = state.llm_client.clone();
    tokio::spawn(async move {
        let config = config::get();
        if let Err(err) =
            scenario_generator::generate(&*llm_client, &*persistence, &broadcast, config, scenario_id, None).await
        {
            tracing::warn!(%scenario_id, error = %err, "scenario generation failed");
        }
    });

    envelope::Envelope::ok(
        StatusCode::ACCEPTED,
        GenerateScenarioResponse {
            id: scenario.id,
            name: scenario.name,
            generation_status: GenerationStatus::Generating,
        },
    )
}

pub async fn list_scenarios(State(state): State<AppState>) -> Response {
    match state.persistence.list_scenarios().await {
        Ok(scenarios) => Envelope::ok(StatusCode::OK, scenarios),
        Err(err) => map_persistence_err(err),
    }
}

/// Full aggregate backing `GET /api/scenarios/:id` (§6): the scenario
/// header plus its simulation clock and authored document cascade.
#[derive(Debug, Serialize)]
pub struct ScenarioAggregate {
    pub scenario: Scenario,
    pub simulation_state: Option<SimulationState>,
    pub strategy_documents: Vec<StrategyDocument>,
    pub planning_documents: Vec<PlanningDocument>,
    pub space_assets: Vec<SpaceAsset>,
}

pub async fn get_scenario(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Response {
    let scenario_id = ScenarioId::from(id);
    let scenario = match state.persistence.get_scenario(scenario_id).await {
        Ok(s) => s,
        Err(err) => return map_persistence_err(err),
    };
    let simulation_state = match state.persistence.get_simulation_state(scenario_id).await {
        Ok(s) => s,
        Err(err) => return map_persistence_err(err),
    };
    let strategy_documents = match state.persistence.list_strategy_documents(scenario_id).await {
        Ok(v) => v,
        Err(err) => return map_persistence_err(err),
    };
    let planning_documents = match state.persistence.list_planning_documents(scenario_id).await {
        Ok(v) => v,
        Err(err) => return map_persistence_err(err),
    };
    let space_assets = match state.persistence.list_space_assets(scenario_id).await {
        Ok(v) => v,
        Err(err) => return map_persistence_err(err),
    };

    Envelope::ok(
        StatusCode::OK,
        ScenarioAggregate { scenario, simulation_state, strategy_documents, planning_documents, space_assets },
    )
}

/// `DELETE /api/scenarios/:id` (§6): 200 even if generation/simulation is
/// active — the engine is stopped first (best-effort, `NotRunning` is not
/// an error here) before the row and its children are removed.
pub async fn delete_scenario(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Response {
    let scenario_id = ScenarioId::from(id);
    let _ = state.controller.stop(scenario_id).await;
    state.broadcast.remove_if_empty(scenario_id);
    match state.persistence.delete_scenario(scenario_id).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "id": scenario_id })),
        Err(err) => map_persistence_err(err),
    }
}

// ---- Simulation control ---------------------------------------------------

pub async fn start_simulation(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Response {
    match state.controller.start(ScenarioId::from(id)).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "status": "RUNNING" })),
        Err(err) => map_engine_err(err),
    }
}

pub async fn pause_simulation(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Response {
    match state.controller.pause(ScenarioId::from(id)).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "status": "PAUSED" })),
        Err(err) => map_engine_err(err),
    }
}

pub async fn resume_simulation(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Response {
    match state.controller.resume(ScenarioId::from(id)).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "status": "RUNNING" })),
        Err(err) => map_engine_err(err),
    }
}

pub async fn stop_simulation(State(state): State<AppState>, Path(id): Path<uuid::Uuid>) -> Response {
    match state.controller.stop(ScenarioId::from(id)).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "status": "STOPPED" })),
        Err(err) => map_engine_err(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct SeekRequest {
    pub target_time: DateTime<Utc>,
}

pub async fn seek_simulation(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SeekRequest>,
) -> Response {
    match state.controller.seek(ScenarioId::from(id), req.target_time).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "targetTime": req.target_time })),
        Err(err) => map_engine_err(err),
    }
}

#[derive(Debug, Deserialize)]
pub struct SetSpeedRequest {
    pub compression_ratio: f64,
}

pub async fn set_speed(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<SetSpeedRequest>,
) -> Response {
    match state.controller.set_speed(ScenarioId::from(id), req.compression_ratio).await {
        Ok(()) => Envelope::ok(StatusCode::OK, serde_json::json!({ "compressionRatio": req.compression_ratio })),
        Err(err) => map_engine_err(err),
    }
}

// ---- Events / decisions ----------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    pub since: Option<DateTime<Utc>>,
}

pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(query): Query<SinceQuery>,
) -> Response {
    let scenario_id = ScenarioId::from(id);
    let since = query.since.unwrap_or_else(|| DateTime::<Utc>::MIN_UTC);
    match state.persistence.list_sim_events(scenario_id, since).await {
        Ok(events) => Envelope::ok(StatusCode::OK, events),
        Err(err) => map_persistence_err(err),
    }
}

/// Decisions are not a distinct persisted entity — a `decision:required`
/// moment is recorded as a `SimEvent` with `kind == DECISION_REQUIRED`
/// (`types::event_kind`), so this resource filters the same event log.
pub async fn list_decisions(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Query(query): Query<SinceQuery>,
) -> Response {
    let scenario_id = ScenarioId::from(id);
    let since = query.since.unwrap_or_else(|| DateTime::<Utc>::MIN_UTC);
    match state.persistence.list_sim_events(scenario_id, since).await {
        Ok(events) => {
            let decisions: Vec<_> =
                events.into_iter().filter(|e| e.kind == event_kind::DECISION_REQUIRED).collect();
            Envelope::ok(StatusCode::OK, decisions)
        }
        Err(err) => map_persistence_err(err),
    }
}

// ---- Ingest ----------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub text: String,
    pub source_hint: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ingest_id: uuid::Uuid,
    pub hierarchy_level: HierarchyLevel,
    pub document_type: String,
    pub parent_link_id: Option<uuid::Uuid>,
    pub entity_count: i32,
    pub review_flag_count: i32,
}

pub async fn ingest_document(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<IngestRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return envelope::bad_request("text is required");
    }
    let scenario_id = ScenarioId::from(id);
    let config = config::get();
    let result = ingest::ingest(
        &*state.llm_client,
        &*state.persistence,
        &state.broadcast,
        config,
        scenario_id,
        &req.text,
        req.source_hint.as_deref(),
    )
    .await;

    match result {
        Ok(r) => Envelope::ok(
            StatusCode::OK,
            IngestResponse {
                ingest_id: r.ingest_id,
                hierarchy_level: r.hierarchy_level,
                document_type: r.document_type,
                parent_link_id: r.parent_link_id,
                entity_count: r.entity_count,
                review_flag_count: r.review_flag_count,
            },
        ),
        Err(IngestError::ClassificationFailed) => envelope::error(StatusCode::UNPROCESSABLE_ENTITY, "classification produced no usable output"),
        Err(IngestError::NormalizationFailed) => envelope::error(StatusCode::UNPROCESSABLE_ENTITY, "normalization produced no usable output"),
        Err(IngestError::Persistence(e)) => map_persistence_err(e),
    }
}

// ---- Health -----------------------------------------------------------------

/// `GET /health` (§6): 200 if the database is reachable, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.persistence.list_scenarios().await {
        Ok(_) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))),
        Err(err) => {
            tracing::warn!(error = %err, "health check: database unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "status": "unavailable" })))
        }
    }
}
