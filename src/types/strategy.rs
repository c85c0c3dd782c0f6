//! StrategyDocument / StrategyPriority — the strategy cascade (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::StrategyDocType;
use super::ids::{ScenarioId, StrategyDocId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StrategyDocument {
    pub id: StrategyDocId,
    pub scenario_id: ScenarioId,
    pub doc_type: StrategyDocType,
    pub tier: i16,
    pub parent_doc_id: Option<StrategyDocId>,
    pub authority_level: String,
    pub content: String,
    pub effective_date: DateTime<Utc>,
}

impl StrategyDocument {
    /// §3 invariant: `parentDocId.tier = tier - 1` when set.
    pub fn parent_tier_is_valid(&self, parent_tier: i16) -> bool {
        parent_tier == self.tier - 1
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StrategyPriority {
    pub id: uuid::Uuid,
    pub strategy_doc_id: StrategyDocId,
    pub rank: i32,
    pub objective: String,
    pub description: String,
}
