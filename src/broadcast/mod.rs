//! Broadcast Adapter (§4's "Broadcast Adapter" component, §6 event table).
//!
//! A room registry over `tokio::sync::broadcast` channels keyed by scenario
//! id, composing the teacher's `tokio::sync::{mpsc, oneshot, RwLock}` idioms
//! (`llm/scheduler.rs`) with the `dashmap` dependency already present in the
//! teacher's `Cargo.toml`. `join`/`leave` are registry operations on a
//! `DashMap<ScenarioId, broadcast::Sender<Event>>`; the eventual WebSocket
//! transport subscribes a receiver per connection and forwards serialized
//! envelopes, exactly as the spec's pub/sub rooms require. Fan-out here is
//! best-effort: a room with no subscribers simply drops the send (the
//! `tokio::sync::broadcast` "no receivers" error is not a failure worth
//! logging at every tick).

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{
    ArtifactStatus, CapabilityType, DecisionOption, Domain, GapSeverity, InjectType,
    MissionId, MissionStatus, ScenarioId, ScenarioInjectId, SpaceAssetId,
};

/// Default channel capacity per scenario room. Slow/absent subscribers miss
/// events rather than backpressure the simulation loop — broadcast fan-out
/// must never block state (§5 shared-resource policy).
const ROOM_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageWindowSummary {
    pub asset_id: SpaceAssetId,
    pub asset_name: String,
    pub capability: CapabilityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub elevation: f64,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapPayload {
    pub mission_id: Option<MissionId>,
    pub capability: CapabilityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub severity: GapSeverity,
    pub priority: i32,
}

/// Every event this server emits on room `scenario:<id>` (§6). Tagged by
/// `event` so a single WebSocket frame type carries the whole catalog; field
/// names match the spec's payload shapes exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    #[serde(rename = "simulation:tick")]
    SimulationTick {
        sim_time: DateTime<Utc>,
        real_time: DateTime<Utc>,
        ratio: f64,
        ato_day: i64,
    },
    #[serde(rename = "mission:status")]
    MissionStatus {
        mission_id: MissionId,
        status: MissionStatus,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename = "position:update")]
    PositionUpdate {
        mission_id: MissionId,
        callsign: Option<String>,
        domain: Domain,
        timestamp: DateTime<Utc>,
        lat: f64,
        lon: f64,
        altitude_ft: Option<f64>,
        heading: Option<f64>,
        speed_kts: Option<f64>,
        status: MissionStatus,
    },
    #[serde(rename = "space:coverage")]
    SpaceCoverage {
        timestamp: DateTime<Utc>,
        windows: Vec<CoverageWindowSummary>,
    },
    #[serde(rename = "gap:detected")]
    GapDetected { timestamp: DateTime<Utc>, gap: GapPayload },
    #[serde(rename = "gap:resolved")]
    GapResolved { timestamp: DateTime<Utc>, gap: GapPayload },
    #[serde(rename = "decision:required")]
    DecisionRequired {
        decision_id: uuid::Uuid,
        severity: GapSeverity,
        capability: CapabilityType,
        mission_id: Option<MissionId>,
        gap_start: DateTime<Utc>,
        gap_end: DateTime<Utc>,
        options: [DecisionOption; 4],
    },
    #[serde(rename = "inject:fired")]
    InjectFired {
        inject_id: ScenarioInjectId,
        inject_type: InjectType,
        title: String,
        description: String,
        impact: String,
        trigger_day: i64,
        trigger_hour: i32,
        fired_at: DateTime<Utc>,
    },
    #[serde(rename = "order:published")]
    OrderPublished {
        order_id: uuid::Uuid,
        order_type: String,
        day: i64,
        source: OrderSource,
    },
    #[serde(rename = "scenario:generation-progress")]
    GenerationProgress {
        scenario_id: ScenarioId,
        step: String,
        progress: i32,
        status: String,
    },
    #[serde(rename = "scenario:artifact-result")]
    ArtifactResult {
        step: String,
        artifact: String,
        status: ArtifactStatus,
        output_length: usize,
        message: Option<String>,
    },
    #[serde(rename = "ingest:started")]
    IngestStarted { ingest_id: uuid::Uuid },
    #[serde(rename = "ingest:classified")]
    IngestClassified {
        ingest_id: uuid::Uuid,
        hierarchy_level: String,
        document_type: String,
    },
    #[serde(rename = "ingest:normalized")]
    IngestNormalized { ingest_id: uuid::Uuid, entity_count: i32 },
    #[serde(rename = "ingest:complete")]
    IngestComplete {
        ingest_id: uuid::Uuid,
        parent_link_id: Option<uuid::Uuid>,
        review_flag_count: i32,
        parse_time_ms: i64,
    },
    #[serde(rename = "ingest:error")]
    IngestError { ingest_id: uuid::Uuid, error: String },
    #[serde(rename = "gamemaster:ato-complete")]
    GameMasterAtoComplete { scenario_id: ScenarioId, day: i64, created_id: uuid::Uuid, duration_ms: i64 },
    #[serde(rename = "gamemaster:bda-complete")]
    GameMasterBdaComplete { scenario_id: ScenarioId, day: i64, created_id: uuid::Uuid, duration_ms: i64 },
    #[serde(rename = "gamemaster:maap-complete")]
    GameMasterMaapComplete { scenario_id: ScenarioId, day: i64, created_id: uuid::Uuid, duration_ms: i64 },
    #[serde(rename = "gamemaster:inject")]
    GameMasterInject { scenario_id: ScenarioId, day: i64, created_id: uuid::Uuid, duration_ms: i64 },
    #[serde(rename = "gamemaster:error")]
    GameMasterError { scenario_id: ScenarioId, day: i64, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderSource {
    GameMaster,
    Fallback,
}

/// Per-scenario room registry. Cheap to clone (a `DashMap` behind no extra
/// indirection) and safe to share across the tick loop, position loop, and
/// the HTTP/WebSocket layer.
#[derive(Default)]
pub struct BroadcastAdapter {
    rooms: DashMap<ScenarioId, broadcast::Sender<Event>>,
}

impl BroadcastAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a scenario's room, creating it if this is the first
    /// subscriber (`join:scenario <id>`, §6).
    pub fn join(&self, scenario_id: ScenarioId) -> broadcast::Receiver<Event> {
        self.rooms
            .entry(scenario_id)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Drop the room's sender once nobody references it. The registry does
    /// not track individual connections — `leave:scenario <id>` on the
    /// client side is just dropping its `Receiver`; `remove_if_empty` is for
    /// scenario deletion/cleanup only.
    pub fn remove_if_empty(&self, scenario_id: ScenarioId) {
        self.rooms.remove_if(&scenario_id, |_, sender| sender.receiver_count() == 0);
    }

    /// Best-effort fan-out. Returns the subscriber count reached, 0 if the
    /// room has no subscribers (never an error — §5, never blocks state).
    pub fn emit(&self, scenario_id: ScenarioId, event: Event) -> usize {
        match self.rooms.get(&scenario_id) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_with_no_subscribers_is_a_no_op() {
        let adapter = BroadcastAdapter::new();
        let scenario_id = ScenarioId::new();
        let reached = adapter.emit(
            scenario_id,
            Event::GenerationProgress {
                scenario_id,
                step: "Strategic Context".to_string(),
                progress: 10,
                status: "GENERATING".to_string(),
            },
        );
        assert_eq!(reached, 0);
    }

    #[tokio::test]
    async fn joined_subscriber_receives_emitted_event() {
        let adapter = BroadcastAdapter::new();
        let scenario_id = ScenarioId::new();
        let mut receiver = adapter.join(scenario_id);

        adapter.emit(
            scenario_id,
            Event::GenerationProgress {
                scenario_id,
                step: "Done".to_string(),
                progress: 100,
                status: "COMPLETE".to_string(),
            },
        );

        let event = receiver.recv().await.unwrap();
        assert!(matches!(event, Event::GenerationProgress { progress: 100, .. }));
    }
}
