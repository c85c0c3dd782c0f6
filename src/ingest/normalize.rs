//! Stage 2: Normalize (§4.6). One mid-tier LLM call per classified
//! hierarchy level, schema selected by `ClassifyResult::hierarchy()`.
//! Every enum-typed field in the deserialized payload is still a raw
//! string at this point — `link_persist` runs it through
//! `ingest::enum_normalize` before it ever reaches a typed column.

use serde::{Deserialize, Serialize};

use crate::broadcast::BroadcastAdapter;
use crate::config::Config;
use crate::ingest::classify::ClassifyResult;
use crate::ingest::schema;
use crate::llm::client::{ChatMessage, LlmClient};
use crate::llm::retry::{call_with_retry, RetryRequest};
use crate::persistence::PersistenceLayer;
use crate::types::{HierarchyLevel, ScenarioId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPriority {
    pub rank: i32,
    pub objective: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedStrategy {
    pub doc_type: String,
    pub authority_level: String,
    pub content: String,
    pub effective_date_str: Option<String>,
    pub priorities: Vec<NormalizedPriority>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPriorityEntry {
    pub rank: i32,
    pub effect: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPlanning {
    pub doc_type: String,
    pub content: String,
    pub effective_date_str: Option<String>,
    pub priorities: Vec<NormalizedPriorityEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedWaypoint {
    pub sequence: i32,
    pub waypoint_type: String,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: Option<f64>,
    pub speed_kts: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTimeWindow {
    pub window_type: String,
    pub start_str: String,
    pub end_str: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTarget {
    pub target_name: String,
    pub lat: f64,
    pub lon: f64,
    pub target_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSupportRequirement {
    pub support_type: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSpaceNeed {
    pub capability_type: String,
    pub priority: i32,
    pub start_str: String,
    pub end_str: String,
    pub coverage_lat: Option<f64>,
    pub coverage_lon: Option<f64>,
    pub fallback_capability: Option<String>,
    pub mission_criticality: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMission {
    pub mission_id: String,
    pub callsign: String,
    pub domain: String,
    pub platform_type: String,
    pub platform_count: i32,
    pub mission_type: String,
    pub affiliation: String,
    pub waypoints: Vec<NormalizedWaypoint>,
    pub time_windows: Vec<NormalizedTimeWindow>,
    pub targets: Vec<NormalizedTarget>,
    pub support_requirements: Vec<NormalizedSupportRequirement>,
    pub space_needs: Vec<NormalizedSpaceNeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPackage {
    pub package_id: String,
    pub priority_rank: i32,
    pub mission_type: String,
    pub effect_desired: String,
    pub missions: Vec<NormalizedMission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOrder {
    pub order_type: String,
    pub ato_day_number: i64,
    pub effective_start_str: String,
    pub effective_end_str: String,
    pub packages: Vec<NormalizedPackage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInject {
    pub title: String,
    pub description: String,
    pub impact: String,
    pub inject_type: String,
    pub dtg: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEventList {
    pub injects: Vec<NormalizedInject>,
}

#[derive(Debug, Clone)]
pub enum Normalized {
    Strategy(NormalizedStrategy),
    Planning(NormalizedPlanning),
    Order(NormalizedOrder),
    EventList(NormalizedEventList),
}

#[allow(clippy::too_many_arguments)]
pub async fn normalize(
    client: &dyn LlmClient,
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    config: &Config,
    scenario_id: ScenarioId,
    raw_text: &str,
    classification: &ClassifyResult,
) -> Option<Normalized> {
    let hierarchy = classification.hierarchy();
    let schema = match hierarchy {
        HierarchyLevel::Strategy => schema::strategy_schema(),
        HierarchyLevel::Planning => schema::planning_schema(),
        HierarchyLevel::Order => schema::order_schema(),
        HierarchyLevel::EventList => schema::event_list_schema(),
    };

    let user_prompt = format!(
        "Extract a fully-populated, strictly-typed record from this {hierarchy_name} document. \
         Every field must be present; use null for genuinely absent optional values. Do not omit \
         array entries you can infer from the text.\n\nDocument text:\n{raw_text}",
        hierarchy_name = classification.document_type,
    );

    let outcome = call_with_retry(
        client,
        persistence,
        broadcast,
        RetryRequest {
            model: config.llm_mid_range.clone(),
            messages: vec![
                ChatMessage::system(
                    "You are a military planning document structuring assistant. Respond only \
                     with the requested structured JSON, matching the schema exactly.",
                ),
                ChatMessage::user(user_prompt),
            ],
            max_tokens: 6_000,
            reasoning_effort: None,
            schema: Some(schema),
            min_output_length: 20,
            max_retries: 2,
            scenario_id,
            step: "Ingest",
            artifact: "normalization",
        },
    )
    .await;

    if outcome.content.is_empty() {
        return None;
    }

    match hierarchy {
        HierarchyLevel::Strategy => {
            serde_json::from_str::<NormalizedStrategy>(&outcome.content).ok().map(Normalized::Strategy)
        }
        HierarchyLevel::Planning => {
            serde_json::from_str::<NormalizedPlanning>(&outcome.content).ok().map(Normalized::Planning)
        }
        HierarchyLevel::Order => {
            serde_json::from_str::<NormalizedOrder>(&outcome.content).ok().map(Normalized::Order)
        }
        HierarchyLevel::EventList => {
            serde_json::from_str::<NormalizedEventList>(&outcome.content).ok().map(Normalized::EventList)
        }
    }
}
