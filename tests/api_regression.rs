//! In-process API regression tests: build the router via `build_router()`
//! and exercise it with `tower::ServiceExt::oneshot()`. No bound port, no
//! real LLM/catalog/database — the same "build the app in-process, drive
//! it with oneshot" shape as the teacher's `tests/api_regression.rs`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use overwatch_sim::api::{build_router, AppState};
use overwatch_sim::broadcast::BroadcastAdapter;
use overwatch_sim::catalog::{CatalogClientError, ElsetRecord, SatelliteCatalog};
use overwatch_sim::config::{self, Config};
use overwatch_sim::engine::SimulationController;
use overwatch_sim::llm::client::{LlmClient, LlmClientError, LlmRequest, LlmResponse};
use overwatch_sim::persistence::InMemoryPersistence;

struct NoopLlmClient;

#[async_trait]
impl LlmClient for NoopLlmClient {
    async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse, LlmClientError> {
        Ok(LlmResponse {
            content: String::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
            finish_reason: "stop".to_string(),
        })
    }
}

struct NoopCatalog;

#[async_trait]
impl SatelliteCatalog for NoopCatalog {
    async fn current(&self, _sat_no: u32) -> Result<Option<ElsetRecord>, CatalogClientError> {
        Ok(None)
    }

    async fn history_at(
        &self,
        _sat_no: u32,
        _epoch: chrono::DateTime<chrono::Utc>,
    ) -> Result<Option<ElsetRecord>, CatalogClientError> {
        Ok(None)
    }
}

fn ensure_config() {
    if !config::is_initialized() {
        config::init(Config {
            port: 3001,
            database_url: String::new(),
            openai_api_key: None,
            cors_origin: "*".to_string(),
            llm_flagship: "test-flagship".to_string(),
            llm_mid_range: "test-mid".to_string(),
            llm_fast: "test-fast".to_string(),
            udl_username: None,
            udl_password: None,
            udl_base_url: None,
            default_compression: 720.0,
            tick_interval_ms: 1000,
            position_update_interval_ms: 2000,
        });
    }
}

fn test_app() -> axum::Router {
    ensure_config();
    let persistence = Arc::new(InMemoryPersistence::new());
    let broadcast = Arc::new(BroadcastAdapter::new());
    let llm_client: Arc<dyn LlmClient> = Arc::new(NoopLlmClient);
    let satellite_catalog: Arc<dyn SatelliteCatalog> = Arc::new(NoopCatalog);
    let controller = Arc::new(SimulationController::new(
        persistence.clone(),
        broadcast.clone(),
        llm_client.clone(),
        Arc::new(config::get().clone()),
    ));
    let state = AppState { persistence, broadcast, controller, llm_client, satellite_catalog };
    build_router(state, "*")
}

#[tokio::test]
async fn health_endpoint_returns_200_against_reachable_store() {
    let app = test_app();
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn list_scenarios_on_empty_store_returns_empty_array() {
    let app = test_app();
    let resp = app
        .oneshot(Request::builder().uri("/api/scenarios").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

/// `POST /api/scenarios/generate` (§6): 202 with `generationStatus:
/// "GENERATING"` on success, never a bare 200 — clients poll the scenario
/// resource afterward rather than waiting on this call.
#[tokio::test]
async fn generate_scenario_with_name_returns_202() {
    let app = test_app();
    let body = serde_json::json!({ "name": "Operation Tidewater" });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/scenarios/generate")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["data"]["generation_status"], "Generating");
}

/// §6: "400 if `name` is missing/blank".
#[tokio::test]
async fn generate_scenario_with_blank_name_returns_400() {
    let app = test_app();
    let body = serde_json::json!({ "name": "   " });
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/scenarios/generate")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_unknown_scenario_returns_404() {
    let app = test_app();
    let missing_id = uuid::Uuid::new_v4();
    let resp = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/scenarios/{missing_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

/// `DELETE /api/scenarios/:id` (§6): 200 even when no such scenario exists
/// — the delete handler stops a (possibly absent) simulation best-effort
/// and treats the persistence delete as the only source of truth.
#[tokio::test]
async fn delete_unknown_scenario_still_returns_ok_or_not_found() {
    let app = test_app();
    let missing_id = uuid::Uuid::new_v4();
    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/scenarios/{missing_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(resp.status() == StatusCode::OK || resp.status() == StatusCode::NOT_FOUND);
}
