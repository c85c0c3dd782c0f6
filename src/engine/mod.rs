//! Simulation Engine (§4.5) — the master tick loop and position/propagation
//! loop, plus the collaborators they drive each iteration. One
//! `SimulationController` holds the single mutable "current simulation"
//! handle (§5 shared-resource policy): `start/pause/resume/stop/seek/
//! set_speed` are the only entry points allowed to touch it, the same
//! shape the teacher's `llm/scheduler.rs` gives its job-queue handle.

pub mod coverage_cycle;
pub mod msel;
pub mod position;
pub mod seek;
pub mod state_machine;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use crate::broadcast::{BroadcastAdapter, Event, OrderSource};
use crate::config::{defaults::COVERAGE_CYCLE_EVERY_N_ITERATIONS, Config};
use crate::game_master::{run_space_allocation, GameMaster, LlmGameMaster};
use crate::llm::client::LlmClient;
use crate::persistence::{OrderBundle, PersistenceError, PersistenceLayer};
use crate::propagation;
use crate::types::*;
use coverage_cycle::GapTracker;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("simulation {0} is already running")]
    AlreadyRunning(ScenarioId),
    #[error("no simulation is running for scenario {0}")]
    NotRunning(ScenarioId),
}

/// The controller's one mutable shared resource (§5 "currentSim handle"):
/// a running simulation's live clock plus the two periodic-timer tasks
/// driving it.
struct RunningSim {
    scenario_id: ScenarioId,
    clock: Arc<RwLock<SimulationState>>,
    is_generating: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
    tick_task: JoinHandle<()>,
    position_task: JoinHandle<()>,
}

impl Drop for RunningSim {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.tick_task.abort();
        self.position_task.abort();
    }
}

/// Owns the simulation's clock and drives its two cooperative loops.
/// Not re-entrant across simulations (§5): at most one scenario may be
/// RUNNING through this controller at a time.
pub struct SimulationController {
    persistence: Arc<dyn PersistenceLayer>,
    broadcast: Arc<BroadcastAdapter>,
    llm_client: Arc<dyn LlmClient>,
    config: Arc<Config>,
    current: RwLock<Option<RunningSim>>,
}

impl SimulationController {
    pub fn new(
        persistence: Arc<dyn PersistenceLayer>,
        broadcast: Arc<BroadcastAdapter>,
        llm_client: Arc<dyn LlmClient>,
        config: Arc<Config>,
    ) -> Self {
        Self { persistence, broadcast, llm_client, config, current: RwLock::new(None) }
    }

    /// Start driving `scenario_id`, resuming from its persisted
    /// `SimulationState` if one exists. Fails fast if a different scenario
    /// is already RUNNING, here or in another process sharing the same
    /// database (§5: the engine is not re-entrant across simulations).
    pub async fn start(&self, scenario_id: ScenarioId) -> Result<(), EngineError> {
        let mut guard = self.current.write().await;
        if let Some(running) = guard.as_ref() {
            if running.scenario_id != scenario_id {
                return Err(EngineError::AlreadyRunning(running.scenario_id));
            }
            return Ok(());
        }
        if let Some(other) = self.persistence.any_running_simulation().await? {
            if other != scenario_id {
                return Err(EngineError::AlreadyRunning(other));
            }
        }

        let scenario = self.persistence.get_scenario(scenario_id).await?;
        let initial = match self.persistence.get_simulation_state(scenario_id).await? {
            Some(existing) => SimulationState { status: SimStatus::Running, ..existing },
            None => SimulationState {
                scenario_id,
                status: SimStatus::Running,
                sim_time: scenario.start_date,
                real_start_time: Utc::now(),
                compression_ratio: self.config.default_compression,
                current_ato_day: 0,
            },
        };
        self.persistence.upsert_simulation_state(&initial).await?;

        let clock = Arc::new(RwLock::new(initial));
        let is_generating = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let tick_task = tokio::spawn(run_tick_loop(
            self.persistence.clone(),
            self.broadcast.clone(),
            self.llm_client.clone(),
            self.config.clone(),
            scenario_id,
            clock.clone(),
            is_generating.clone(),
            stop_flag.clone(),
        ));
        let position_task = tokio::spawn(run_position_loop(
            self.persistence.clone(),
            self.broadcast.clone(),
            self.config.clone(),
            scenario_id,
            clock.clone(),
            is_generating.clone(),
            stop_flag.clone(),
        ));

        *guard = Some(RunningSim { scenario_id, clock, is_generating, stop_flag, tick_task, position_task });
        Ok(())
    }

    pub async fn pause(&self, scenario_id: ScenarioId) -> Result<(), EngineError> {
        self.set_status(scenario_id, SimStatus::Paused).await
    }

    pub async fn resume(&self, scenario_id: ScenarioId) -> Result<(), EngineError> {
        self.set_status(scenario_id, SimStatus::Running).await
    }

    async fn set_status(&self, scenario_id: ScenarioId, status: SimStatus) -> Result<(), EngineError> {
        let guard = self.current.read().await;
        let running = guard
            .as_ref()
            .filter(|r| r.scenario_id == scenario_id)
            .ok_or(EngineError::NotRunning(scenario_id))?;
        let mut state = running.clock.write().await;
        state.status = status;
        self.persistence.upsert_simulation_state(&state).await?;
        Ok(())
    }

    /// Clear timers, null the simulation handle, and persist a STOPPED
    /// snapshot (§5 cancellation).
    pub async fn stop(&self, scenario_id: ScenarioId) -> Result<(), EngineError> {
        let mut guard = self.current.write().await;
        let running = match guard.take() {
            Some(r) if r.scenario_id == scenario_id => r,
            Some(other) => {
                let not_running = other.scenario_id;
                *guard = Some(other);
                return Err(EngineError::NotRunning(not_running));
            }
            None => return Err(EngineError::NotRunning(scenario_id)),
        };

        let mut state = running.clock.write().await;
        state.status = SimStatus::Stopped;
        self.persistence.upsert_simulation_state(&state).await?;
        drop(state);
        drop(running); // Drop aborts both loop tasks.
        Ok(())
    }

    pub async fn set_speed(&self, scenario_id: ScenarioId, compression_ratio: f64) -> Result<(), EngineError> {
        let guard = self.current.read().await;
        let running = guard
            .as_ref()
            .filter(|r| r.scenario_id == scenario_id)
            .ok_or(EngineError::NotRunning(scenario_id))?;
        let mut state = running.clock.write().await;
        state.compression_ratio = compression_ratio;
        self.persistence.upsert_simulation_state(&state).await?;
        Ok(())
    }

    /// `seek(targetTime)` — works whether or not the scenario's loops are
    /// currently live, since replay is derived purely from the `SimEvent`
    /// log (`engine::seek`).
    pub async fn seek(&self, scenario_id: ScenarioId, target_time: DateTime<Utc>) -> Result<(), EngineError> {
        let scenario = self.persistence.get_scenario(scenario_id).await?;
        let guard = self.current.read().await;
        let running = guard.as_ref().filter(|r| r.scenario_id == scenario_id);

        let ratio = match running {
            Some(r) => r.clock.read().await.compression_ratio,
            None => self.config.default_compression,
        };
        let (clamped, ato_day) =
            seek::seek(&*self.persistence, &self.broadcast, &scenario, target_time, ratio).await?;

        if let Some(r) = running {
            let mut state = r.clock.write().await;
            state.sim_time = clamped;
            state.current_ato_day = ato_day;
            self.persistence.upsert_simulation_state(&state).await?;
        } else if let Some(mut state) = self.persistence.get_simulation_state(scenario_id).await? {
            state.sim_time = clamped;
            state.current_ato_day = ato_day;
            self.persistence.upsert_simulation_state(&state).await?;
        }
        Ok(())
    }

    pub async fn is_running(&self, scenario_id: ScenarioId) -> bool {
        matches!(self.current.read().await.as_ref(), Some(r) if r.scenario_id == scenario_id)
    }
}

/// Wall-clock tick loop (§4.5 clock model, §5 ordering guarantees). Every
/// suspension point re-checks `status == RUNNING` before mutating further
/// (§5 suspension points) so a concurrent stop/delete is survived cleanly.
#[allow(clippy::too_many_arguments)]
async fn run_tick_loop(
    persistence: Arc<dyn PersistenceLayer>,
    broadcast: Arc<BroadcastAdapter>,
    llm_client: Arc<dyn LlmClient>,
    config: Arc<Config>,
    scenario_id: ScenarioId,
    clock: Arc<RwLock<SimulationState>>,
    is_generating: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(config.tick_interval_ms));
    loop {
        interval.tick().await;
        if stop_flag.load(Ordering::SeqCst) {
            return;
        }

        let (status, sim_time, compression_ratio, current_ato_day) = {
            let state = clock.read().await;
            (state.status, state.sim_time, state.compression_ratio, state.current_ato_day)
        };
        if status != SimStatus::Running || is_generating.load(Ordering::SeqCst) {
            continue;
        }

        // (i) advance simTime
        let new_sim_time = sim_time
            + Duration::milliseconds((config.tick_interval_ms as f64 * compression_ratio) as i64);

        // (ii) recompute atoDay
        let scenario = match persistence.get_scenario(scenario_id).await {
            Ok(s) => s,
            Err(err) if err.is_concurrent_deletion() => {
                stop_flag.store(true, Ordering::SeqCst);
                return;
            }
            Err(err) => {
                warn!(scenario_id = %scenario_id, error = %err, "tick: failed to load scenario, skipping tick");
                continue;
            }
        };
        let new_ato_day = scenario.ato_day_for(new_sim_time);

        // (iii) day-boundary check & generation. The sim clock's mathematical
        // counter pauses logically for the duration (§5 day-boundary exclusivity).
        if new_ato_day > current_ato_day {
            is_generating.store(true, Ordering::SeqCst);
            run_day_boundary_cycle(
                &persistence,
                &broadcast,
                &*llm_client,
                &config,
                scenario_id,
                current_ato_day,
                new_ato_day,
            )
            .await;
            is_generating.store(false, Ordering::SeqCst);
        }

        if stop_flag.load(Ordering::SeqCst) {
            return;
        }

        {
            let mut state = clock.write().await;
            if state.status != SimStatus::Running {
                continue;
            }
            state.sim_time = new_sim_time;
            state.current_ato_day = new_ato_day;
            if let Err(err) = persistence.upsert_simulation_state(&state).await {
                warn!(scenario_id = %scenario_id, error = %err, "tick: failed to persist simulation state");
            }
        }

        // (iv) broadcast tick
        broadcast.emit(
            scenario_id,
            Event::SimulationTick { sim_time: new_sim_time, real_time: Utc::now(), ratio: compression_ratio, ato_day: new_ato_day },
        );

        // (v) mission-status advance
        advance_missions(&persistence, &broadcast, scenario_id, new_sim_time).await;

        // (vi) MSEL firing
        msel::fire_due_injects(&persistence, &broadcast, scenario_id, new_ato_day, new_sim_time).await;

        // (vii) BDA recording is persisted inside the day-boundary cycle
        // above, immediately after a successful assess_bda call.
    }
}

async fn advance_missions(
    persistence: &Arc<dyn PersistenceLayer>,
    broadcast: &Arc<BroadcastAdapter>,
    scenario_id: ScenarioId,
    sim_time: DateTime<Utc>,
) {
    let missions = match persistence.list_all_active_missions(scenario_id).await {
        Ok(m) => m,
        Err(err) => {
            warn!(scenario_id = %scenario_id, error = %err, "mission advance: failed to load missions");
            return;
        }
    };

    for mission in missions {
        let windows = match persistence.list_time_windows(mission.id).await {
            Ok(w) => w,
            Err(err) => {
                warn!(scenario_id = %scenario_id, mission_id = %mission.id, error = %err, "mission advance: failed to load time windows");
                continue;
            }
        };
        let Some(tot) = windows.iter().find(|w| w.is_tot()) else { continue };

        let delta_hours = state_machine::delta_hours(sim_time, tot.start);
        let new_status = state_machine::advance(mission.status, delta_hours);
        if new_status == mission.status {
            continue;
        }

        if let Err(err) = persistence.update_mission_status(mission.id, new_status).await {
            warn!(scenario_id = %scenario_id, mission_id = %mission.id, error = %err, "mission advance: failed to persist status");
            continue;
        }
        broadcast.emit(
            scenario_id,
            Event::MissionStatus { mission_id: mission.id, status: new_status, timestamp: sim_time },
        );
    }
}

/// Position/propagation loop (§4.5, §5 ordering guarantees).
#[allow(clippy::too_many_arguments)]
async fn run_position_loop(
    persistence: Arc<dyn PersistenceLayer>,
    broadcast: Arc<BroadcastAdapter>,
    config: Arc<Config>,
    scenario_id: ScenarioId,
    clock: Arc<RwLock<SimulationState>>,
    is_generating: Arc<AtomicBool>,
    stop_flag: Arc<AtomicBool>,
) {
    let mut interval =
        tokio::time::interval(std::time::Duration::from_millis(config.position_update_interval_ms));
    let mut gap_tracker = GapTracker::new();
    let mut iteration: u64 = 0;

    loop {
        interval.tick().await;
        if stop_flag.load(Ordering::SeqCst) {
            return;
        }

        let (status, sim_time, compression_ratio) = {
            let state = clock.read().await;
            (state.status, state.sim_time, state.compression_ratio)
        };
        if status != SimStatus::Running || is_generating.load(Ordering::SeqCst) {
            continue;
        }

        // (i) propagate missions
        propagate_missions(&persistence, &broadcast, scenario_id, sim_time).await;
        if stop_flag.load(Ordering::SeqCst) {
            return;
        }

        // (ii) propagate satellites
        propagate_satellites(&persistence, scenario_id, sim_time).await;
        if stop_flag.load(Ordering::SeqCst) {
            return;
        }

        // (iii) every 5th iteration, compute coverage & gaps
        iteration += 1;
        if iteration % COVERAGE_CYCLE_EVERY_N_ITERATIONS == 0 {
            let window_duration = Duration::milliseconds(
                (config.position_update_interval_ms as f64
                    * COVERAGE_CYCLE_EVERY_N_ITERATIONS as f64
                    * compression_ratio) as i64,
            );
            coverage_cycle::run(
                &persistence,
                &broadcast,
                &mut gap_tracker,
                scenario_id,
                sim_time,
                window_duration,
            )
            .await;
        }
    }
}

async fn propagate_missions(
    persistence: &Arc<dyn PersistenceLayer>,
    broadcast: &Arc<BroadcastAdapter>,
    scenario_id: ScenarioId,
    sim_time: DateTime<Utc>,
) {
    let missions = match persistence.list_all_active_missions(scenario_id).await {
        Ok(m) => m,
        Err(err) => {
            warn!(scenario_id = %scenario_id, error = %err, "position loop: failed to load missions");
            return;
        }
    };

    for mission in missions.iter().filter(|m| m.domain != Domain::Space) {
        let mut waypoints = match persistence.list_waypoints(mission.id).await {
            Ok(w) => w,
            Err(err) => {
                warn!(scenario_id = %scenario_id, mission_id = %mission.id, error = %err, "position loop: failed to load waypoints");
                continue;
            }
        };
        waypoints.sort_by_key(|w| w.sequence);

        let windows = match persistence.list_time_windows(mission.id).await {
            Ok(w) => w,
            Err(err) => {
                warn!(scenario_id = %scenario_id, mission_id = %mission.id, error = %err, "position loop: failed to load time windows");
                continue;
            }
        };
        let Some(first_window) = windows.iter().min_by_key(|w| w.start) else { continue };
        let Some(total_hours) = position::total_flight_hours(&waypoints, mission.domain) else { continue };

        let mission_start = position::infer_mission_start(first_window.start, total_hours);
        let Some(pos) = position::interpolate(&waypoints, mission.domain, mission_start, sim_time) else {
            continue;
        };

        broadcast.emit(
            scenario_id,
            Event::PositionUpdate {
                mission_id: mission.id,
                callsign: Some(mission.callsign.clone()),
                domain: mission.domain,
                timestamp: sim_time,
                lat: pos.lat,
                lon: pos.lon,
                altitude_ft: pos.altitude_ft,
                heading: pos.heading_deg,
                speed_kts: Some(pos.speed_kts),
                status: mission.status,
            },
        );
    }
}

/// Re-propagate every OPERATIONAL asset once per iteration so a stale TLE
/// or a degenerate orbit surfaces promptly in the logs. No broadcast: the
/// `position:update` payload is keyed by `MissionId`/`MissionStatus` and
/// has no satellite-shaped counterpart — the coverage cycle below is what
/// actually consumes these propagated positions downstream.
async fn propagate_satellites(persistence: &Arc<dyn PersistenceLayer>, scenario_id: ScenarioId, sim_time: DateTime<Utc>) {
    let assets = match persistence.list_space_assets(scenario_id).await {
        Ok(a) => a,
        Err(err) => {
            warn!(scenario_id = %scenario_id, error = %err, "position loop: failed to load space assets");
            return;
        }
    };
    for asset in assets.iter().filter(|a| a.status == AssetStatus::Operational) {
        if let Err(err) = propagation::position_at(asset, sim_time) {
            warn!(scenario_id = %scenario_id, asset_id = %asset.id, error = %err, "satellite propagation failed this iteration");
        }
    }
}

/// Day-boundary Game Master cycle (§4.5): walks every day crossed since the
/// last tick one at a time — mirroring `state_machine::advance`'s
/// walk-every-intervening-state treatment of a large jump — running BDA(n-1)
/// -> ATO(n) -> Space Allocator(n) for each.
async fn run_day_boundary_cycle(
    persistence: &Arc<dyn PersistenceLayer>,
    broadcast: &Arc<BroadcastAdapter>,
    llm_client: &dyn LlmClient,
    config: &Config,
    scenario_id: ScenarioId,
    previous_ato_day: i64,
    new_ato_day: i64,
) {
    for day in (previous_ato_day + 1)..=new_ato_day {
        run_single_day_boundary(persistence, broadcast, llm_client, config, scenario_id, day).await;
    }
}

async fn run_single_day_boundary(
    persistence: &Arc<dyn PersistenceLayer>,
    broadcast: &Arc<BroadcastAdapter>,
    llm_client: &dyn LlmClient,
    config: &Config,
    scenario_id: ScenarioId,
    day: i64,
) {
    let game_master = LlmGameMaster::new(llm_client, &**persistence, broadcast, config);

    // (a) BDA for the prior day. Non-fatal: a failure here never blocks ATO
    // generation for the new day.
    if day > 0 {
        match game_master.assess_bda(scenario_id, day - 1).await {
            Ok(_) => {
                let event = SimEvent {
                    id: SimEventId::new(),
                    scenario_id,
                    time: Utc::now(),
                    kind: event_kind::BDA_RECORDED.to_string(),
                    subject_id: None,
                    detail: serde_json::json!({ "atoDay": day - 1 }),
                };
                if let Err(err) = persistence.append_sim_event(&event).await {
                    warn!(scenario_id = %scenario_id, error = %err, "failed to persist BDA_RECORDED event");
                }
            }
            Err(err) => {
                warn!(scenario_id = %scenario_id, day = day - 1, error = %err, "BDA assessment failed, continuing day-boundary cycle");
            }
        }
    }

    // (b) ATO for day n, falling back to deterministic order-seeding on
    // LLM failure; (c) Space Allocator for day n either way.
    match game_master.generate_ato(scenario_id, day).await {
        Ok(_) => {
            if let Err(err) = run_space_allocation(&**persistence, scenario_id, day).await {
                warn!(scenario_id = %scenario_id, day, error = %err, "space allocation failed after ATO generation");
            }
        }
        Err(err) => {
            warn!(scenario_id = %scenario_id, day, error = %err, "ATO generation failed, falling back to deterministic order seeding");
            match fallback_seed_order(persistence, scenario_id, day).await {
                Ok(order_id) => {
                    broadcast.emit(
                        scenario_id,
                        Event::OrderPublished { order_id, order_type: "ATO".to_string(), day, source: OrderSource::Fallback },
                    );
                }
                Err(fallback_err) => {
                    warn!(scenario_id = %scenario_id, day, error = %fallback_err, "fallback order seeding also failed");
                }
            }
            if let Err(err) = run_space_allocation(&**persistence, scenario_id, day).await {
                warn!(scenario_id = %scenario_id, day, error = %err, "space allocation failed after fallback order seeding");
            }
        }
    }
}

/// Deterministic non-LLM order-seeding path (§4.5): an empty ATO shell for
/// `day` with no packages, published so the rest of the pipeline has a
/// `TaskingOrder` row to hang subsequent ingest/allocation cycles off of.
async fn fallback_seed_order(
    persistence: &Arc<dyn PersistenceLayer>,
    scenario_id: ScenarioId,
    day: i64,
) -> Result<Uuid, PersistenceError> {
    let scenario = persistence.get_scenario(scenario_id).await?;
    let day_start = scenario.start_date + Duration::days(day);
    let day_end = day_start + Duration::days(1);

    let order = TaskingOrder {
        id: TaskingOrderId::new(),
        scenario_id,
        order_type: OrderType::Ato,
        ato_day_number: day,
        effective_start: day_start,
        effective_end: day_end,
        planning_doc_id: None,
    };
    let order_id = order.id.0;
    persistence.create_order_bundle(&OrderBundle { order, packages: vec![] }).await?;
    Ok(order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{LlmClientError, LlmRequest, LlmResponse};
    use crate::persistence::InMemoryPersistence;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct FailingLlmClient;

    #[async_trait]
    impl LlmClient for FailingLlmClient {
        async fn chat(&self, _request: LlmRequest) -> Result<LlmResponse, LlmClientError> {
            Err(LlmClientError::Transport("no endpoint in tests".to_string()))
        }
    }

    fn scenario() -> Scenario {
        Scenario {
            id: ScenarioId::new(),
            name: "Test".to_string(),
            theater: "Test".to_string(),
            adversary: "Test".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap(),
            generation_status: GenerationStatus::Complete,
            generation_step: None,
            generation_progress: 100,
            generation_error: None,
        }
    }

    fn test_config() -> Config {
        Config {
            port: 3001,
            database_url: "postgres://unused".to_string(),
            openai_api_key: None,
            cors_origin: "*".to_string(),
            llm_flagship: "test".to_string(),
            llm_mid_range: "test".to_string(),
            llm_fast: "test".to_string(),
            udl_username: None,
            udl_password: None,
            udl_base_url: None,
            default_compression: 720.0,
            tick_interval_ms: 50,
            position_update_interval_ms: 100,
        }
    }

    #[tokio::test]
    async fn start_twice_for_different_scenarios_fails_fast() {
        let persistence: Arc<dyn PersistenceLayer> = Arc::new(InMemoryPersistence::new());
        let broadcast = Arc::new(BroadcastAdapter::new());
        let llm_client: Arc<dyn LlmClient> = Arc::new(FailingLlmClient);
        let config = Arc::new(test_config());

        let controller =
            SimulationController::new(persistence.clone(), broadcast, llm_client, config);

        let a = scenario();
        let b = scenario();
        persistence.create_scenario(&a).await.unwrap();
        persistence.create_scenario(&b).await.unwrap();

        controller.start(a.id).await.unwrap();
        let err = controller.start(b.id).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyRunning(id) if id == a.id));

        controller.stop(a.id).await.unwrap();
    }

    #[tokio::test]
    async fn stop_on_a_never_started_scenario_fails() {
        let persistence: Arc<dyn PersistenceLayer> = Arc::new(InMemoryPersistence::new());
        let broadcast = Arc::new(BroadcastAdapter::new());
        let llm_client: Arc<dyn LlmClient> = Arc::new(FailingLlmClient);
        let config = Arc::new(test_config());
        let controller = SimulationController::new(persistence, broadcast, llm_client, config);

        let err = controller.stop(ScenarioId::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::NotRunning(_)));
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_status() {
        let persistence: Arc<dyn PersistenceLayer> = Arc::new(InMemoryPersistence::new());
        let broadcast = Arc::new(BroadcastAdapter::new());
        let llm_client: Arc<dyn LlmClient> = Arc::new(FailingLlmClient);
        let config = Arc::new(test_config());
        let controller =
            SimulationController::new(persistence.clone(), broadcast, llm_client, config);

        let s = scenario();
        persistence.create_scenario(&s).await.unwrap();
        controller.start(s.id).await.unwrap();

        controller.pause(s.id).await.unwrap();
        let paused = persistence.get_simulation_state(s.id).await.unwrap().unwrap();
        assert_eq!(paused.status, SimStatus::Paused);

        controller.resume(s.id).await.unwrap();
        let running = persistence.get_simulation_state(s.id).await.unwrap().unwrap();
        assert_eq!(running.status, SimStatus::Running);

        controller.stop(s.id).await.unwrap();
        let stopped = persistence.get_simulation_state(s.id).await.unwrap().unwrap();
        assert_eq!(stopped.status, SimStatus::Stopped);
    }
}
