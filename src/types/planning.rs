//! PlanningDocument / PriorityEntry (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::PlanningDocType;
use super::ids::{PlanningDocId, ScenarioId, StrategyDocId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlanningDocument {
    pub id: PlanningDocId,
    pub scenario_id: ScenarioId,
    pub doc_type: PlanningDocType,
    pub strategy_doc_id: Option<StrategyDocId>,
    pub content: String,
    pub effective_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriorityEntry {
    pub id: uuid::Uuid,
    pub planning_doc_id: PlanningDocId,
    pub rank: i32,
    pub effect: String,
    pub description: String,
    /// Traceability match against a `StrategyPriority`, set when the
    /// keyword-overlap ratio in `ingest::link_persist` clears the 0.15
    /// threshold.
    pub strategy_priority_id: Option<uuid::Uuid>,
}
