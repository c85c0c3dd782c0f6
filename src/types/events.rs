//! ScenarioInject / SimEvent (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::InjectType;
use super::ids::{ScenarioId, ScenarioInjectId, SimEventId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScenarioInject {
    pub id: ScenarioInjectId,
    pub scenario_id: ScenarioId,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub trigger_day: i64,
    pub trigger_hour: i32,
    pub inject_type: InjectType,
    pub fired: bool,
    pub fired_at: Option<DateTime<Utc>>,
}

/// Time-stamped facts recorded by the engine: asset destruction/degradation,
/// mission delays, BDA recordings, decisions required, MSEL fires. `kind` is
/// a free-form tag (`SATELLITE_DESTROYED`, `SATELLITE_JAMMED`,
/// `MISSION_DELAYED`, `BDA_RECORDED`, `DECISION_REQUIRED`, …) rather than an
/// exhaustive enum, mirroring the teacher's `job_type` string-constants
/// module (`hub::intelligence::job_queue::job_type`) so new event kinds
/// never need a migration.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SimEvent {
    pub id: SimEventId,
    pub scenario_id: ScenarioId,
    pub time: DateTime<Utc>,
    pub kind: String,
    pub subject_id: Option<uuid::Uuid>,
    pub detail: serde_json::Value,
}

pub mod event_kind {
    pub const SATELLITE_DESTROYED: &str = "SATELLITE_DESTROYED";
    pub const SATELLITE_JAMMED: &str = "SATELLITE_JAMMED";
    pub const MISSION_DELAYED: &str = "MISSION_DELAYED";
    pub const BDA_RECORDED: &str = "BDA_RECORDED";
    pub const DECISION_REQUIRED: &str = "DECISION_REQUIRED";
    pub const INFORMATIONAL: &str = "INFORMATIONAL";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOption {
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequired {
    pub decision_id: uuid::Uuid,
    pub severity: super::enums::GapSeverity,
    pub capability: super::enums::CapabilityType,
    pub mission_id: Option<uuid::Uuid>,
    pub gap_start: DateTime<Utc>,
    pub gap_end: DateTime<Utc>,
    pub options: [DecisionOption; 4],
}
