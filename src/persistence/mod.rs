//! Persistence Adapter (§2 ambient stack, §6 data model) — entity CRUD plus
//! nested-include reads behind one trait, mirroring the teacher's
//! `PersistenceLayer` trait in `storage/persistence.rs`: the simulation
//! engine, ingest pipeline, and Game Master depend on `dyn PersistenceLayer`,
//! never a concrete `PgPool`, so tests swap in `InMemoryPersistence`.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryPersistence;
pub use postgres::PostgresPersistence;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::types::*;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("not found")]
    NotFound,
    #[error("foreign key violation: {0}")]
    ForeignKeyViolation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl PersistenceError {
    /// §5/§7: the sentinel kind the engine's loops and the ingest pipeline
    /// check for to detect a mid-cycle scenario deletion and abort cleanly
    /// rather than propagate.
    pub fn is_concurrent_deletion(&self) -> bool {
        matches!(self, PersistenceError::NotFound | PersistenceError::ForeignKeyViolation(_))
    }
}

/// Everything needed to materialize a freshly-ingested tasking order in one
/// transactional unit (§4.6 ORDER case, §9 transactionality note).
#[derive(Debug, Clone, Default)]
pub struct OrderBundle {
    pub order: TaskingOrder,
    pub packages: Vec<PackageBundle>,
}

#[derive(Debug, Clone, Default)]
pub struct PackageBundle {
    pub package: MissionPackage,
    pub missions: Vec<MissionBundle>,
}

#[derive(Debug, Clone, Default)]
pub struct MissionBundle {
    pub mission: Mission,
    pub waypoints: Vec<Waypoint>,
    pub time_windows: Vec<TimeWindow>,
    pub targets: Vec<MissionTarget>,
    pub support_requirements: Vec<SupportRequirement>,
    pub space_needs: Vec<SpaceNeed>,
}

/// A mission joined with its package's priority and strategy-traced rank —
/// exactly the shape the Space Allocator's `AnnotatedNeed` needs, assembled
/// once by the persistence layer rather than re-derived at every call site.
#[derive(Debug, Clone)]
pub struct NeedWithContext {
    pub need: SpaceNeed,
    pub package_priority_rank: i32,
    pub strategy_priority_rank: Option<i32>,
}

#[async_trait]
pub trait PersistenceLayer: Send + Sync {
    // ---- Scenario ----------------------------------------------------
    async fn create_scenario(&self, scenario: &Scenario) -> Result<(), PersistenceError>;
    async fn get_scenario(&self, id: ScenarioId) -> Result<Scenario, PersistenceError>;
    async fn update_scenario_generation(
        &self,
        id: ScenarioId,
        status: GenerationStatus,
        step: Option<&str>,
        progress: i32,
        error: Option<&str>,
    ) -> Result<(), PersistenceError>;
    async fn delete_scenario(&self, id: ScenarioId) -> Result<(), PersistenceError>;
    async fn list_scenarios(&self) -> Result<Vec<Scenario>, PersistenceError>;

    // ---- SimulationState ----------------------------------------------
    async fn get_simulation_state(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Option<SimulationState>, PersistenceError>;
    async fn upsert_simulation_state(&self, state: &SimulationState) -> Result<(), PersistenceError>;
    async fn any_running_simulation(&self) -> Result<Option<ScenarioId>, PersistenceError>;

    // ---- Strategy cascade ----------------------------------------------
    async fn create_strategy_document(
        &self,
        doc: &StrategyDocument,
        priorities: &[StrategyPriority],
    ) -> Result<(), PersistenceError>;
    async fn list_strategy_documents(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<StrategyDocument>, PersistenceError>;
    async fn highest_tier_strategy_document(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Option<StrategyDocument>, PersistenceError>;
    async fn list_strategy_priorities(
        &self,
        strategy_doc_id: StrategyDocId,
    ) -> Result<Vec<StrategyPriority>, PersistenceError>;

    // ---- Planning documents ---------------------------------------------
    async fn create_planning_document(
        &self,
        doc: &PlanningDocument,
        priorities: &[PriorityEntry],
    ) -> Result<(), PersistenceError>;
    /// Append priority entries to an already-persisted planning document
    /// (§4.8 BDA-driven DEGRADED/RE-STRIKE entries) without touching its
    /// existing rows — unlike `create_planning_document`, which seeds a
    /// brand new document.
    async fn append_priority_entries(
        &self,
        planning_doc_id: PlanningDocId,
        entries: &[PriorityEntry],
    ) -> Result<(), PersistenceError>;
    async fn list_planning_documents(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<PlanningDocument>, PersistenceError>;
    async fn latest_planning_document(
        &self,
        scenario_id: ScenarioId,
        doc_type: PlanningDocType,
    ) -> Result<Option<PlanningDocument>, PersistenceError>;

    // ---- Tasking orders (transactional nested write) --------------------
    async fn create_order_bundle(&self, bundle: &OrderBundle) -> Result<(), PersistenceError>;
    async fn list_tasking_orders(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<TaskingOrder>, PersistenceError>;
    async fn list_missions_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<Mission>, PersistenceError>;
    async fn list_all_active_missions(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<Mission>, PersistenceError>;
    async fn list_waypoints(&self, mission_id: MissionId) -> Result<Vec<Waypoint>, PersistenceError>;
    async fn list_time_windows(
        &self,
        mission_id: MissionId,
    ) -> Result<Vec<TimeWindow>, PersistenceError>;
    async fn update_mission_status(
        &self,
        mission_id: MissionId,
        status: MissionStatus,
    ) -> Result<(), PersistenceError>;

    // ---- Space assets / needs / coverage --------------------------------
    async fn create_space_assets(&self, assets: &[SpaceAsset]) -> Result<(), PersistenceError>;
    async fn list_space_assets(&self, scenario_id: ScenarioId) -> Result<Vec<SpaceAsset>, PersistenceError>;
    async fn update_asset_status(
        &self,
        asset_id: SpaceAssetId,
        status: AssetStatus,
    ) -> Result<(), PersistenceError>;
    async fn list_space_needs_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<NeedWithContext>, PersistenceError>;
    async fn list_active_space_needs(
        &self,
        scenario_id: ScenarioId,
        at: DateTime<Utc>,
    ) -> Result<Vec<SpaceNeed>, PersistenceError>;
    async fn mark_needs_fulfilled(&self, need_ids: &[SpaceNeedId]) -> Result<(), PersistenceError>;
    async fn insert_coverage_windows(
        &self,
        windows: &[SpaceCoverageWindow],
    ) -> Result<(), PersistenceError>;
    async fn list_coverage_windows(
        &self,
        scenario_id: ScenarioId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SpaceCoverageWindow>, PersistenceError>;

    // ---- Injects / events -----------------------------------------------
    async fn create_inject(&self, inject: &ScenarioInject) -> Result<(), PersistenceError>;
    async fn due_injects(
        &self,
        scenario_id: ScenarioId,
        current_ato_day: i64,
        current_hour_utc: i32,
    ) -> Result<Vec<ScenarioInject>, PersistenceError>;
    async fn mark_inject_fired(
        &self,
        inject_id: ScenarioInjectId,
        fired_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;
    async fn append_sim_event(&self, event: &SimEvent) -> Result<(), PersistenceError>;
    async fn list_sim_events(
        &self,
        scenario_id: ScenarioId,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<SimEvent>, PersistenceError>;

    // ---- Logs -------------------------------------------------------------
    async fn append_generation_log(&self, log: &GenerationLog) -> Result<(), PersistenceError>;
    async fn append_ingest_log(&self, log: &IngestLog) -> Result<(), PersistenceError>;

    // ---- Generic lookups used by the Game Master's context packet -------
    async fn get_mission_package(
        &self,
        id: MissionPackageId,
    ) -> Result<MissionPackage, PersistenceError>;
    async fn delete_planning_documents_by_type(
        &self,
        scenario_id: ScenarioId,
        doc_type: PlanningDocType,
    ) -> Result<(), PersistenceError>;
    async fn delete_tasking_orders_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<(), PersistenceError>;
    async fn delete_injects(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError>;
    async fn delete_strategy_documents(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError>;
    /// §4.7: every Scenario Generator step idempotently deletes its prior
    /// output before writing, so regeneration (resume-from-step) is safe.
    async fn delete_space_assets(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError>;
}

/// Helper shared by both backends: does a thrown storage-layer identifier
/// look like "record not found"/FK violation (§7 sentinel detection)? Kept
/// here so the Postgres backend's error mapping and the in-memory backend's
/// `Option`-based lookups produce the exact same `PersistenceError` variants.
pub(crate) fn not_found() -> PersistenceError {
    PersistenceError::NotFound
}

pub(crate) type EntityId = Uuid;
