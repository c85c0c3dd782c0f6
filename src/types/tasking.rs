//! TaskingOrder / MissionPackage (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::OrderType;
use super::ids::{MissionPackageId, PlanningDocId, ScenarioId, TaskingOrderId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskingOrder {
    pub id: TaskingOrderId,
    pub scenario_id: ScenarioId,
    pub order_type: OrderType,
    pub ato_day_number: i64,
    pub effective_start: DateTime<Utc>,
    pub effective_end: DateTime<Utc>,
    pub planning_doc_id: Option<PlanningDocId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MissionPackage {
    pub id: MissionPackageId,
    pub tasking_order_id: TaskingOrderId,
    pub package_id: String,
    pub priority_rank: i32,
    pub mission_type: String,
    pub effect_desired: String,
}
