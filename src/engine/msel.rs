//! MSEL inject firing (§4.5). Each tick, due injects are marked fired and
//! their effect applied by type. Friendly to the engine's per-substep
//! error-swallowing policy (§7): a failure touching one inject is logged and
//! does not stop the others from firing.

use chrono::{DateTime, Timelike, Utc};
use rand::seq::SliceRandom;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::broadcast::{BroadcastAdapter, Event};
use crate::persistence::PersistenceLayer;
use crate::types::{
    event_kind, AssetStatus, InjectType, MissionStatus, ScenarioId, SimEvent, SimEventId,
};

/// Select and fire every due inject for `scenario_id` at `sim_time`/
/// `current_ato_day`. Returns the count fired (mostly useful to tests).
pub async fn fire_due_injects(
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    scenario_id: ScenarioId,
    current_ato_day: i64,
    sim_time: DateTime<Utc>,
) -> usize {
    let due = match persistence
        .due_injects(scenario_id, current_ato_day, sim_time.hour() as i32)
        .await
    {
        Ok(injects) => injects,
        Err(err) => {
            warn!(scenario_id = %scenario_id, error = %err, "failed to load due injects, skipping this tick's MSEL firing");
            return 0;
        }
    };

    let mut fired_count = 0;
    for inject in due {
        if let Err(err) = apply_effect(persistence, inject.inject_type, scenario_id, sim_time).await {
            warn!(scenario_id = %scenario_id, inject_id = %inject.id, error = %err, "MSEL effect application failed, marking fired anyway");
        }

        if let Err(err) = persistence.mark_inject_fired(inject.id, sim_time).await {
            warn!(scenario_id = %scenario_id, inject_id = %inject.id, error = %err, "failed to mark inject fired");
            continue;
        }

        fired_count += 1;
        broadcast.emit(
            scenario_id,
            Event::InjectFired {
                inject_id: inject.id,
                inject_type: inject.inject_type,
                title: inject.title,
                description: inject.description,
                impact: inject.impact,
                trigger_day: inject.trigger_day,
                trigger_hour: inject.trigger_hour,
                fired_at: sim_time,
            },
        );
    }

    fired_count
}

async fn apply_effect(
    persistence: &dyn PersistenceLayer,
    inject_type: InjectType,
    scenario_id: ScenarioId,
    sim_time: DateTime<Utc>,
) -> Result<(), crate::persistence::PersistenceError> {
    match inject_type {
        InjectType::Space => {
            let assets = persistence.list_space_assets(scenario_id).await?;
            let operational: Vec<_> =
                assets.into_iter().filter(|a| a.status == AssetStatus::Operational).collect();
            let Some(asset) = operational.choose(&mut rand::thread_rng()) else {
                return Ok(());
            };
            persistence.update_asset_status(asset.id, AssetStatus::Degraded).await?;
            persistence
                .append_sim_event(&SimEvent {
                    id: SimEventId::new(),
                    scenario_id,
                    time: sim_time,
                    kind: event_kind::SATELLITE_JAMMED.to_string(),
                    subject_id: Some(asset.id.0),
                    detail: json!({ "assetName": asset.name }),
                })
                .await
        }
        InjectType::Friction => {
            let missions = persistence.list_all_active_missions(scenario_id).await?;
            let active: Vec<_> = missions
                .into_iter()
                .filter(|m| {
                    !matches!(m.status, MissionStatus::Recovered | MissionStatus::Delayed | MissionStatus::Lost)
                })
                .collect();
            let Some(mission) = active.choose(&mut rand::thread_rng()) else {
                return Ok(());
            };
            persistence.update_mission_status(mission.id, MissionStatus::Delayed).await?;
            persistence
                .append_sim_event(&SimEvent {
                    id: SimEventId::new(),
                    scenario_id,
                    time: sim_time,
                    kind: event_kind::MISSION_DELAYED.to_string(),
                    subject_id: Some(mission.id.0),
                    detail: json!({ "callsign": mission.callsign }),
                })
                .await
        }
        InjectType::Intel | InjectType::Crisis => {
            persistence
                .append_sim_event(&SimEvent {
                    id: SimEventId::new(),
                    scenario_id,
                    time: sim_time,
                    kind: event_kind::INFORMATIONAL.to_string(),
                    subject_id: None::<Uuid>,
                    detail: json!({ "injectType": format!("{inject_type:?}") }),
                })
                .await
        }
        InjectType::Information
        | InjectType::Action
        | InjectType::DecisionPoint
        | InjectType::Contingency => {
            persistence
                .append_sim_event(&SimEvent {
                    id: SimEventId::new(),
                    scenario_id,
                    time: sim_time,
                    kind: event_kind::INFORMATIONAL.to_string(),
                    subject_id: None::<Uuid>,
                    detail: json!({ "injectType": format!("{inject_type:?}") }),
                })
                .await
        }
    }
}
