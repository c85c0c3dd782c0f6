//! In-memory `PersistenceLayer` — mirrors the teacher's `InMemoryDAL` in
//! `storage/persistence.rs`: thread-safe via `std::sync::RwLock`, not
//! durable, used for tests and minimal deployments that don't need Postgres.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    not_found, NeedWithContext, OrderBundle, PersistenceError, PersistenceLayer,
};
use crate::types::*;

#[derive(Default)]
struct Store {
    scenarios: HashMap<ScenarioId, Scenario>,
    sim_states: HashMap<ScenarioId, SimulationState>,
    strategy_docs: HashMap<StrategyDocId, StrategyDocument>,
    strategy_priorities: HashMap<StrategyDocId, Vec<StrategyPriority>>,
    planning_docs: HashMap<PlanningDocId, PlanningDocument>,
    priority_entries: HashMap<PlanningDocId, Vec<PriorityEntry>>,
    tasking_orders: HashMap<TaskingOrderId, TaskingOrder>,
    mission_packages: HashMap<MissionPackageId, MissionPackage>,
    missions: HashMap<MissionId, Mission>,
    waypoints: HashMap<MissionId, Vec<Waypoint>>,
    time_windows: HashMap<MissionId, Vec<TimeWindow>>,
    targets: HashMap<MissionId, Vec<MissionTarget>>,
    support_reqs: HashMap<MissionId, Vec<SupportRequirement>>,
    space_needs: HashMap<SpaceNeedId, SpaceNeed>,
    space_assets: HashMap<SpaceAssetId, SpaceAsset>,
    coverage_windows: Vec<SpaceCoverageWindow>,
    injects: HashMap<ScenarioInjectId, ScenarioInject>,
    sim_events: Vec<SimEvent>,
    generation_logs: Vec<GenerationLog>,
    ingest_logs: Vec<IngestLog>,
}

/// In-memory persistence. Not durable; each `Scenario`'s data lives only as
/// long as this struct does.
#[derive(Default)]
pub struct InMemoryPersistence {
    store: RwLock<Store>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
        self.store.read().expect("persistence lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Store> {
        self.store.write().expect("persistence lock poisoned")
    }
}

#[async_trait]
impl PersistenceLayer for InMemoryPersistence {
    async fn create_scenario(&self, scenario: &Scenario) -> Result<(), PersistenceError> {
        self.write().scenarios.insert(scenario.id, scenario.clone());
        Ok(())
    }

    async fn get_scenario(&self, id: ScenarioId) -> Result<Scenario, PersistenceError> {
        self.read().scenarios.get(&id).cloned().ok_or_else(not_found)
    }

    async fn update_scenario_generation(
        &self,
        id: ScenarioId,
        status: GenerationStatus,
        step: Option<&str>,
        progress: i32,
        error: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let scenario = store.scenarios.get_mut(&id).ok_or_else(not_found)?;
        scenario.generation_status = status;
        scenario.generation_step = step.map(String::from);
        scenario.generation_progress = progress;
        scenario.generation_error = error.map(String::from);
        Ok(())
    }

    async fn delete_scenario(&self, id: ScenarioId) -> Result<(), PersistenceError> {
        let mut store = self.write();
        if store.scenarios.remove(&id).is_none() {
            return Err(not_found());
        }
        store.sim_states.remove(&id);
        store.strategy_docs.retain(|_, d| d.scenario_id != id);
        store.planning_docs.retain(|_, d| d.scenario_id != id);
        store.tasking_orders.retain(|_, o| o.scenario_id != id);
        store.space_assets.retain(|_, a| a.scenario_id != id);
        store.injects.retain(|_, i| i.scenario_id != id);
        store.sim_events.retain(|e| e.scenario_id != id);
        Ok(())
    }

    async fn list_scenarios(&self) -> Result<Vec<Scenario>, PersistenceError> {
        Ok(self.read().scenarios.values().cloned().collect())
    }

    async fn get_simulation_state(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Option<SimulationState>, PersistenceError> {
        Ok(self.read().sim_states.get(&scenario_id).cloned())
    }

    async fn upsert_simulation_state(&self, state: &SimulationState) -> Result<(), PersistenceError> {
        self.write().sim_states.insert(state.scenario_id, state.clone());
        Ok(())
    }

    async fn any_running_simulation(&self) -> Result<Option<ScenarioId>, PersistenceError> {
        Ok(self
            .read()
            .sim_states
            .values()
            .find(|s| s.status == SimStatus::Running)
            .map(|s| s.scenario_id))
    }

    async fn create_strategy_document(
        &self,
        doc: &StrategyDocument,
        priorities: &[StrategyPriority],
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        store.strategy_docs.insert(doc.id, doc.clone());
        store.strategy_priorities.insert(doc.id, priorities.to_vec());
        Ok(())
    }

    async fn list_strategy_documents(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<StrategyDocument>, PersistenceError> {
        Ok(self
            .read()
            .strategy_docs
            .values()
            .filter(|d| d.scenario_id == scenario_id)
            .cloned()
            .collect())
    }

    async fn highest_tier_strategy_document(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Option<StrategyDocument>, PersistenceError> {
        Ok(self
            .read()
            .strategy_docs
            .values()
            .filter(|d| d.scenario_id == scenario_id)
            .max_by_key(|d| d.tier)
            .cloned())
    }

    async fn list_strategy_priorities(
        &self,
        strategy_doc_id: StrategyDocId,
    ) -> Result<Vec<StrategyPriority>, PersistenceError> {
        Ok(self
            .read()
            .strategy_priorities
            .get(&strategy_doc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_planning_document(
        &self,
        doc: &PlanningDocument,
        priorities: &[PriorityEntry],
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        store.planning_docs.insert(doc.id, doc.clone());
        store.priority_entries.insert(doc.id, priorities.to_vec());
        Ok(())
    }

    async fn list_planning_documents(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<PlanningDocument>, PersistenceError> {
        Ok(self
            .read()
            .planning_docs
            .values()
            .filter(|d| d.scenario_id == scenario_id)
            .cloned()
            .collect())
    }

    async fn append_priority_entries(
        &self,
        planning_doc_id: PlanningDocId,
        entries: &[PriorityEntry],
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        if !store.planning_docs.contains_key(&planning_doc_id) {
            return Err(not_found());
        }
        store
            .priority_entries
            .entry(planning_doc_id)
            .or_default()
            .extend(entries.iter().cloned());
        Ok(())
    }

    async fn latest_planning_document(
        &self,
        scenario_id: ScenarioId,
        doc_type: PlanningDocType,
    ) -> Result<Option<PlanningDocument>, PersistenceError> {
        Ok(self
            .read()
            .planning_docs
            .values()
            .filter(|d| d.scenario_id == scenario_id && d.doc_type == doc_type)
            .max_by_key(|d| d.effective_date)
            .cloned())
    }

    async fn create_order_bundle(&self, bundle: &OrderBundle) -> Result<(), PersistenceError> {
        let mut store = self.write();
        store.tasking_orders.insert(bundle.order.id, bundle.order.clone());
        for pkg in &bundle.packages {
            store.mission_packages.insert(pkg.package.id, pkg.package.clone());
            for m in &pkg.missions {
                store.missions.insert(m.mission.id, m.mission.clone());
                store.waypoints.insert(m.mission.id, m.waypoints.clone());
                store.time_windows.insert(m.mission.id, m.time_windows.clone());
                store.targets.insert(m.mission.id, m.targets.clone());
                store.support_reqs.insert(m.mission.id, m.support_requirements.clone());
                for need in &m.space_needs {
                    store.space_needs.insert(need.id, need.clone());
                }
            }
        }
        Ok(())
    }

    async fn list_tasking_orders(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<TaskingOrder>, PersistenceError> {
        Ok(self
            .read()
            .tasking_orders
            .values()
            .filter(|o| o.scenario_id == scenario_id && o.ato_day_number == ato_day)
            .cloned()
            .collect())
    }

    async fn list_missions_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<Mission>, PersistenceError> {
        let store = self.read();
        let order_ids: Vec<TaskingOrderId> = store
            .tasking_orders
            .values()
            .filter(|o| o.scenario_id == scenario_id && o.ato_day_number == ato_day)
            .map(|o| o.id)
            .collect();
        let package_ids: Vec<MissionPackageId> = store
            .mission_packages
            .values()
            .filter(|p| order_ids.contains(&p.tasking_order_id))
            .map(|p| p.id)
            .collect();
        Ok(store
            .missions
            .values()
            .filter(|m| package_ids.contains(&m.mission_package_id))
            .cloned()
            .collect())
    }

    async fn list_all_active_missions(
        &self,
        scenario_id: ScenarioId,
    ) -> Result<Vec<Mission>, PersistenceError> {
        let store = self.read();
        let order_ids: Vec<TaskingOrderId> = store
            .tasking_orders
            .values()
            .filter(|o| o.scenario_id == scenario_id)
            .map(|o| o.id)
            .collect();
        let package_ids: Vec<MissionPackageId> = store
            .mission_packages
            .values()
            .filter(|p| order_ids.contains(&p.tasking_order_id))
            .map(|p| p.id)
            .collect();
        Ok(store
            .missions
            .values()
            .filter(|m| {
                package_ids.contains(&m.mission_package_id)
                    && !matches!(m.status, MissionStatus::Recovered | MissionStatus::Lost)
            })
            .cloned()
            .collect())
    }

    async fn list_waypoints(&self, mission_id: MissionId) -> Result<Vec<Waypoint>, PersistenceError> {
        let mut wps = self.read().waypoints.get(&mission_id).cloned().unwrap_or_default();
        wps.sort_by_key(|w| w.sequence);
        Ok(wps)
    }

    async fn list_time_windows(
        &self,
        mission_id: MissionId,
    ) -> Result<Vec<TimeWindow>, PersistenceError> {
        Ok(self.read().time_windows.get(&mission_id).cloned().unwrap_or_default())
    }

    async fn update_mission_status(
        &self,
        mission_id: MissionId,
        status: MissionStatus,
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let mission = store.missions.get_mut(&mission_id).ok_or_else(not_found)?;
        mission.status = status;
        Ok(())
    }

    async fn create_space_assets(&self, assets: &[SpaceAsset]) -> Result<(), PersistenceError> {
        let mut store = self.write();
        for asset in assets {
            store.space_assets.insert(asset.id, asset.clone());
        }
        Ok(())
    }

    async fn list_space_assets(&self, scenario_id: ScenarioId) -> Result<Vec<SpaceAsset>, PersistenceError> {
        Ok(self
            .read()
            .space_assets
            .values()
            .filter(|a| a.scenario_id == scenario_id)
            .cloned()
            .collect())
    }

    async fn update_asset_status(
        &self,
        asset_id: SpaceAssetId,
        status: AssetStatus,
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let asset = store.space_assets.get_mut(&asset_id).ok_or_else(not_found)?;
        asset.status = status;
        Ok(())
    }

    async fn list_space_needs_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<Vec<NeedWithContext>, PersistenceError> {
        let store = self.read();
        let order_ids: Vec<TaskingOrderId> = store
            .tasking_orders
            .values()
            .filter(|o| o.scenario_id == scenario_id && o.ato_day_number == ato_day)
            .map(|o| o.id)
            .collect();
        let mut result = Vec::new();
        for pkg in store.mission_packages.values() {
            if !order_ids.contains(&pkg.tasking_order_id) {
                continue;
            }
            for mission in store.missions.values() {
                if mission.mission_package_id != pkg.id {
                    continue;
                }
                for need in store.space_needs.values() {
                    if need.mission_id != mission.id {
                        continue;
                    }
                    result.push(NeedWithContext {
                        need: need.clone(),
                        package_priority_rank: pkg.priority_rank,
                        strategy_priority_rank: need.strategy_rank,
                    });
                }
            }
        }
        Ok(result)
    }

    async fn list_active_space_needs(
        &self,
        scenario_id: ScenarioId,
        at: DateTime<Utc>,
    ) -> Result<Vec<SpaceNeed>, PersistenceError> {
        let store = self.read();
        let mission_ids: std::collections::HashSet<MissionId> = store
            .missions
            .values()
            .filter(|m| {
                store
                    .mission_packages
                    .get(&m.mission_package_id)
                    .and_then(|p| store.tasking_orders.get(&p.tasking_order_id))
                    .map(|o| o.scenario_id == scenario_id)
                    .unwrap_or(false)
            })
            .map(|m| m.id)
            .collect();
        Ok(store
            .space_needs
            .values()
            .filter(|n| mission_ids.contains(&n.mission_id) && n.start_time <= at && at <= n.end_time)
            .cloned()
            .collect())
    }

    async fn mark_needs_fulfilled(&self, need_ids: &[SpaceNeedId]) -> Result<(), PersistenceError> {
        let mut store = self.write();
        for id in need_ids {
            if let Some(need) = store.space_needs.get_mut(id) {
                need.fulfilled = true;
            }
        }
        Ok(())
    }

    async fn insert_coverage_windows(
        &self,
        windows: &[SpaceCoverageWindow],
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        for w in windows {
            let duplicate = store.coverage_windows.iter().any(|existing| {
                existing.asset_id == w.asset_id
                    && existing.capability_type == w.capability_type
                    && existing.start == w.start
                    && existing.end == w.end
            });
            if !duplicate {
                store.coverage_windows.push(w.clone());
            }
        }
        Ok(())
    }

    async fn list_coverage_windows(
        &self,
        _scenario_id: ScenarioId,
        since: DateTime<Utc>,
    ) -> Result<Vec<SpaceCoverageWindow>, PersistenceError> {
        Ok(self
            .read()
            .coverage_windows
            .iter()
            .filter(|w| w.end >= since)
            .cloned()
            .collect())
    }

    async fn create_inject(&self, inject: &ScenarioInject) -> Result<(), PersistenceError> {
        self.write().injects.insert(inject.id, inject.clone());
        Ok(())
    }

    async fn due_injects(
        &self,
        scenario_id: ScenarioId,
        current_ato_day: i64,
        current_hour_utc: i32,
    ) -> Result<Vec<ScenarioInject>, PersistenceError> {
        Ok(self
            .read()
            .injects
            .values()
            .filter(|i| {
                i.scenario_id == scenario_id
                    && !i.fired
                    && (i.trigger_day < current_ato_day
                        || (i.trigger_day == current_ato_day && i.trigger_hour <= current_hour_utc))
            })
            .cloned()
            .collect())
    }

    async fn mark_inject_fired(
        &self,
        inject_id: ScenarioInjectId,
        fired_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let inject = store.injects.get_mut(&inject_id).ok_or_else(not_found)?;
        inject.fired = true;
        inject.fired_at = Some(fired_at);
        Ok(())
    }

    async fn append_sim_event(&self, event: &SimEvent) -> Result<(), PersistenceError> {
        self.write().sim_events.push(event.clone());
        Ok(())
    }

    async fn list_sim_events(
        &self,
        scenario_id: ScenarioId,
        up_to: DateTime<Utc>,
    ) -> Result<Vec<SimEvent>, PersistenceError> {
        let mut events: Vec<SimEvent> = self
            .read()
            .sim_events
            .iter()
            .filter(|e| e.scenario_id == scenario_id && e.time <= up_to)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.time);
        Ok(events)
    }

    async fn append_generation_log(&self, log: &GenerationLog) -> Result<(), PersistenceError> {
        self.write().generation_logs.push(log.clone());
        Ok(())
    }

    async fn append_ingest_log(&self, log: &IngestLog) -> Result<(), PersistenceError> {
        self.write().ingest_logs.push(log.clone());
        Ok(())
    }

    async fn get_mission_package(
        &self,
        id: MissionPackageId,
    ) -> Result<MissionPackage, PersistenceError> {
        self.read().mission_packages.get(&id).cloned().ok_or_else(not_found)
    }

    async fn delete_planning_documents_by_type(
        &self,
        scenario_id: ScenarioId,
        doc_type: PlanningDocType,
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let ids: Vec<PlanningDocId> = store
            .planning_docs
            .values()
            .filter(|d| d.scenario_id == scenario_id && d.doc_type == doc_type)
            .map(|d| d.id)
            .collect();
        for id in ids {
            store.planning_docs.remove(&id);
            store.priority_entries.remove(&id);
        }
        Ok(())
    }

    async fn delete_tasking_orders_for_day(
        &self,
        scenario_id: ScenarioId,
        ato_day: i64,
    ) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let ids: Vec<TaskingOrderId> = store
            .tasking_orders
            .values()
            .filter(|o| o.scenario_id == scenario_id && o.ato_day_number == ato_day)
            .map(|o| o.id)
            .collect();
        for id in ids {
            store.tasking_orders.remove(&id);
        }
        Ok(())
    }

    async fn delete_injects(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError> {
        let mut store = self.write();
        store.injects.retain(|_, i| i.scenario_id != scenario_id);
        Ok(())
    }

    async fn delete_strategy_documents(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError> {
        let mut store = self.write();
        let ids: Vec<StrategyDocId> = store
            .strategy_docs
            .values()
            .filter(|d| d.scenario_id == scenario_id)
            .map(|d| d.id)
            .collect();
        for id in ids {
            store.strategy_docs.remove(&id);
            store.strategy_priorities.remove(&id);
        }
        Ok(())
    }

    async fn delete_space_assets(&self, scenario_id: ScenarioId) -> Result<(), PersistenceError> {
        let mut store = self.write();
        store.space_assets.retain(|_, a| a.scenario_id != scenario_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn scenario() -> Scenario {
        Scenario {
            id: ScenarioId::new(),
            name: "Test".into(),
            theater: "PACOM".into(),
            adversary: "REDLAND".into(),
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap(),
            generation_status: GenerationStatus::NotStarted,
            generation_step: None,
            generation_progress: 0,
            generation_error: None,
        }
    }

    #[tokio::test]
    async fn create_and_get_scenario_round_trips() {
        let store = InMemoryPersistence::new();
        let s = scenario();
        store.create_scenario(&s).await.unwrap();
        let fetched = store.get_scenario(s.id).await.unwrap();
        assert_eq!(fetched.name, "Test");
    }

    #[tokio::test]
    async fn missing_scenario_is_not_found() {
        let store = InMemoryPersistence::new();
        let err = store.get_scenario(ScenarioId::new()).await.unwrap_err();
        assert!(err.is_concurrent_deletion());
    }

    #[tokio::test]
    async fn only_one_simulation_reports_running() {
        let store = InMemoryPersistence::new();
        let s = scenario();
        store.create_scenario(&s).await.unwrap();
        let state = SimulationState {
            scenario_id: s.id,
            status: SimStatus::Running,
            sim_time: s.start_date,
            real_start_time: Utc::now(),
            compression_ratio: 720.0,
            current_ato_day: 0,
        };
        store.upsert_simulation_state(&state).await.unwrap();
        assert_eq!(store.any_running_simulation().await.unwrap(), Some(s.id));
    }
}
