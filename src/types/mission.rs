//! Mission and its owned children: Waypoint, TimeWindow, MissionTarget,
//! SupportRequirement (§3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{Affiliation, Domain, MissionStatus, SupportType, TimeWindowType, WaypointType};
use super::ids::{MissionId, MissionPackageId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Mission {
    pub id: MissionId,
    pub mission_package_id: MissionPackageId,
    pub mission_id: String,
    pub callsign: String,
    pub domain: Domain,
    pub platform_type: String,
    pub platform_count: i32,
    pub mission_type: String,
    pub status: MissionStatus,
    pub affiliation: Affiliation,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Waypoint {
    pub id: uuid::Uuid,
    pub mission_id: MissionId,
    /// Unique within a mission, forming a dense 1..N sequence (§3 invariant).
    pub sequence: i32,
    pub waypoint_type: WaypointType,
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: Option<f64>,
    pub speed_kts: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeWindow {
    pub id: uuid::Uuid,
    pub mission_id: MissionId,
    pub window_type: TimeWindowType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn is_tot(&self) -> bool {
        matches!(self.window_type, TimeWindowType::Tot)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MissionTarget {
    pub id: uuid::Uuid,
    pub mission_id: MissionId,
    pub target_name: String,
    pub lat: f64,
    pub lon: f64,
    pub target_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SupportRequirement {
    pub id: uuid::Uuid,
    pub mission_id: MissionId,
    pub support_type: SupportType,
    pub description: String,
}
