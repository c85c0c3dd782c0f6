//! Scenario and SimulationState — the two root aggregates (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{GenerationStatus, SimStatus};
use super::ids::ScenarioId;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: String,
    pub theater: String,
    pub adversary: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub generation_status: GenerationStatus,
    pub generation_step: Option<String>,
    pub generation_progress: i32,
    pub generation_error: Option<String>,
}

impl Scenario {
    /// Day number (0-indexed) that `instant` falls within, clamped to the
    /// scenario's bounds.
    pub fn ato_day_for(&self, instant: DateTime<Utc>) -> i64 {
        let clamped = instant.clamp(self.start_date, self.end_date);
        (clamped - self.start_date).num_days().max(0)
    }
}

/// One per scenario (§3 invariant: only one SimulationState is ever RUNNING
/// across all scenarios, enforced by `engine::SimulationController`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SimulationState {
    pub scenario_id: ScenarioId,
    pub status: SimStatus,
    pub sim_time: DateTime<Utc>,
    pub real_start_time: DateTime<Utc>,
    pub compression_ratio: f64,
    pub current_ato_day: i64,
}
