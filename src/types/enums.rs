//! Domain enums for the simulation data model.
//!
//! Each enum that is persisted derives `sqlx::Type` over a `TEXT` column
//! (`rename_all = "SCREAMING_SNAKE_CASE"`), the same shape the teacher uses
//! for `SatelliteStatus`/`RigState` in the orbital-mechanics and drilling
//! example code — new job types don't need a migration, just a new variant.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    NotStarted,
    Generating,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimStatus {
    Running,
    Paused,
    Stopped,
}

/// Strategy cascade tier. Tier 1 is the most senior document (NDS), tier 5
/// the most junior (OPLAN). `doc_type.tier()` is the single source of truth
/// for the tier <-> doc-type mapping used at link time (§4.6 STRATEGY case).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrategyDocType {
    Nds,
    Nms,
    Jscp,
    Conplan,
    Oplan,
}

impl StrategyDocType {
    pub fn tier(self) -> u8 {
        match self {
            StrategyDocType::Nds => 1,
            StrategyDocType::Nms => 2,
            StrategyDocType::Jscp => 3,
            StrategyDocType::Conplan => 4,
            StrategyDocType::Oplan => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanningDocType {
    Jiptl,
    Spins,
    Aco,
    Maap,
    Msel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Ato,
    Mto,
    Sto,
    Opord,
    Exord,
    Fragord,
    Aco,
    Spins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Domain {
    Air,
    Maritime,
    Space,
    Land,
}

/// Mission state machine states (§4.5). Ordering matters only for display;
/// transition legality lives in `engine::state_machine`, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Planned,
    Briefed,
    Launched,
    Airborne,
    OnStation,
    Engaged,
    Egressing,
    Rtb,
    Recovered,
    Delayed,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WaypointType {
    Dep,
    Ip,
    Cp,
    Tgt,
    Egr,
    Rec,
    Orbit,
    Refuel,
    Cap,
    Patrol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeWindowType {
    Tot,
    Onsta,
    Launch,
    Recovery,
}

/// Space capability catalog (~18 values per spec §3). Every capability has a
/// minimum-elevation entry in `coverage::min_elevation_deg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapabilityType {
    Gps,
    GpsMilitary,
    Satcom,
    SatcomProtected,
    SatcomWideband,
    Opir,
    IsrSpace,
    SigintSpace,
    Link16,
    CyberSpace,
    MissileWarning,
    WeatherSpace,
    Navwar,
    SpaceDomainAwareness,
    PositionNavTiming,
    TacticalSatcom,
    NuclearDetection,
    CommunicationsRelay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionCriticality {
    Critical,
    Essential,
    Enhancing,
    Routine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Affiliation {
    Friendly,
    Hostile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetStatus {
    Operational,
    Degraded,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InjectType {
    Friction,
    Intel,
    Crisis,
    Space,
    Information,
    Action,
    DecisionPoint,
    Contingency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GapSeverity {
    Low,
    Degraded,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStatus {
    Fulfilled,
    Degraded,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HierarchyLevel {
    Strategy,
    Planning,
    Order,
    EventList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupportType {
    Tanker,
    Sead,
    Isr,
    Awacs,
    Escort,
    Cas,
    Strike,
    Ew,
}

/// LLM Retry/Logger attempt status taxonomy (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    Success,
    Placeholder,
    Error,
    Retry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactStatus {
    Success,
    Placeholder,
    Error,
}

impl From<AttemptStatus> for Option<ArtifactStatus> {
    fn from(status: AttemptStatus) -> Self {
        match status {
            AttemptStatus::Success => Some(ArtifactStatus::Success),
            AttemptStatus::Placeholder => Some(ArtifactStatus::Placeholder),
            AttemptStatus::Error => Some(ArtifactStatus::Error),
            AttemptStatus::Retry => None,
        }
    }
}
