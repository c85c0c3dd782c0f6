//! SpaceNeed / SpaceAsset / SpaceCoverageWindow (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Affiliation, AssetStatus, CapabilityType, MissionCriticality};
use super::ids::{MissionId, ScenarioId, SpaceAssetId, SpaceNeedId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpaceNeed {
    pub id: SpaceNeedId,
    pub mission_id: MissionId,
    pub capability_type: CapabilityType,
    /// Priority rank, ascending = more urgent (1 is highest).
    pub priority: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub coverage_lat: Option<f64>,
    pub coverage_lon: Option<f64>,
    pub fallback_capability: Option<CapabilityType>,
    pub mission_criticality: MissionCriticality,
    pub fulfilled: bool,
    /// Strategy-traced priority rank, when the owning mission package links
    /// to a `StrategyPriority` (used as the primary contention-resolution
    /// tiebreaker in `allocation::resolve_contention`).
    pub strategy_rank: Option<i32>,
}

impl SpaceNeed {
    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time < end && start < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpaceAsset {
    pub id: SpaceAssetId,
    pub scenario_id: ScenarioId,
    pub name: String,
    pub constellation: String,
    pub affiliation: Affiliation,
    pub capabilities: Vec<CapabilityType>,
    pub tle_line1: Option<String>,
    pub tle_line2: Option<String>,
    pub inclination_deg: Option<f64>,
    pub period_min: Option<f64>,
    pub eccentricity: Option<f64>,
    pub base_lon: Option<f64>,
    pub status: AssetStatus,
}

impl SpaceAsset {
    pub fn has_tle(&self) -> bool {
        self.tle_line1.is_some() && self.tle_line2.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SpaceCoverageWindow {
    pub id: uuid::Uuid,
    pub asset_id: SpaceAssetId,
    pub capability_type: CapabilityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub max_elevation_deg: f64,
    pub center_lat: f64,
    pub center_lon: f64,
    pub swath_width_km: f64,
}

impl SpaceCoverageWindow {
    pub fn overlap_with(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> chrono::Duration {
        let overlap_start = self.start.max(start);
        let overlap_end = self.end.min(end);
        if overlap_end > overlap_start {
            overlap_end - overlap_start
        } else {
            chrono::Duration::zero()
        }
    }
}
