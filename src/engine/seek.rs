//! Event replay (§4.5 "seek"). Deriving asset status from the `SimEvent`
//! log rather than trusting whatever is currently persisted makes `seek`
//! idempotent — replaying the same event prefix twice always yields the
//! same derived state (§8 invariant).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::broadcast::{BroadcastAdapter, Event};
use crate::persistence::{PersistenceError, PersistenceLayer};
use crate::types::{event_kind, AssetStatus, Scenario, SpaceAssetId};

/// Derive every asset's status from the `SimEvent` log up to (and
/// including) `target_time`, in chronological order. Later events win.
fn derive_asset_statuses(
    events: &[crate::types::SimEvent],
    target_time: DateTime<Utc>,
) -> HashMap<SpaceAssetId, AssetStatus> {
    let mut sorted: Vec<&crate::types::SimEvent> =
        events.iter().filter(|e| e.time <= target_time).collect();
    sorted.sort_by_key(|e| e.time);

    let mut statuses = HashMap::new();
    for event in sorted {
        let Some(subject) = event.subject_id else { continue };
        match event.kind.as_str() {
            event_kind::SATELLITE_DESTROYED => {
                statuses.insert(SpaceAssetId(subject), AssetStatus::Lost);
            }
            event_kind::SATELLITE_JAMMED => {
                statuses.insert(SpaceAssetId(subject), AssetStatus::Degraded);
            }
            _ => {}
        }
    }
    statuses
}

/// `seek(targetTime)`: clamp to scenario bounds, recompute atoDay, replay
/// events to derive and persist asset statuses, and emit a synchronizing
/// tick. Assets with no destructive/degrading event in the replayed prefix
/// are left OPERATIONAL.
pub async fn seek(
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    scenario: &Scenario,
    target_time: DateTime<Utc>,
    compression_ratio: f64,
) -> Result<(DateTime<Utc>, i64), PersistenceError> {
    let clamped = target_time.clamp(scenario.start_date, scenario.end_date);
    let ato_day = scenario.ato_day_for(clamped);

    let events = persistence.list_sim_events(scenario.id, clamped).await?;
    let derived = derive_asset_statuses(&events, clamped);

    let all_assets = persistence.list_space_assets(scenario.id).await?;
    for asset in &all_assets {
        let target_status = derived.get(&asset.id).copied().unwrap_or(AssetStatus::Operational);
        if asset.status != target_status {
            if let Err(err) = persistence.update_asset_status(asset.id, target_status).await {
                warn!(scenario_id = %scenario.id, asset_id = %asset.id, error = %err, "seek: failed to persist derived asset status");
            }
        }
    }

    broadcast.emit(
        scenario.id,
        Event::SimulationTick {
            sim_time: clamped,
            real_time: Utc::now(),
            ratio: compression_ratio,
            ato_day,
        },
    );

    Ok((clamped, ato_day))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryPersistence;
    use crate::types::{event_kind, Affiliation, Scenario, SimEvent, SimEventId};
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn scenario() -> Scenario {
        Scenario {
            id: ScenarioId::new(),
            name: "Test".to_string(),
            theater: "Test".to_string(),
            adversary: "Test".to_string(),
            start_date: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap(),
            generation_status: crate::types::GenerationStatus::Complete,
            generation_step: None,
            generation_progress: 100,
            generation_error: None,
        }
    }

    #[tokio::test]
    async fn seeking_before_destruction_leaves_asset_operational() {
        let persistence = InMemoryPersistence::new();
        let broadcast = BroadcastAdapter::new();
        let scenario = scenario();
        persistence.create_scenario(&scenario).await.unwrap();

        let asset_id = crate::types::SpaceAssetId::new();
        let asset = crate::types::SpaceAsset {
            id: asset_id,
            scenario_id: scenario.id,
            name: "S1".to_string(),
            constellation: "TEST".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(53.0),
            period_min: Some(95.0),
            eccentricity: Some(0.001),
            base_lon: Some(0.0),
            status: AssetStatus::Operational,
        };
        persistence.create_space_assets(&[asset]).await.unwrap();

        let t1 = scenario.start_date + Duration::hours(2);
        let t2 = scenario.start_date + Duration::hours(5);

        persistence
            .append_sim_event(&SimEvent {
                id: SimEventId::new(),
                scenario_id: scenario.id,
                time: t1,
                kind: event_kind::SATELLITE_DESTROYED.to_string(),
                subject_id: Some(asset_id.0),
                detail: serde_json::json!({}),
            })
            .await
            .unwrap();
        persistence
            .append_sim_event(&SimEvent {
                id: SimEventId::new(),
                scenario_id: scenario.id,
                time: t2,
                kind: event_kind::SATELLITE_JAMMED.to_string(),
                subject_id: Some(asset_id.0),
                detail: serde_json::json!({}),
            })
            .await
            .unwrap();

        // Before t1: still operational.
        let before = scenario.start_date + Duration::hours(1);
        seek(&persistence, &broadcast, &scenario, before, 720.0).await.unwrap();
        let assets = persistence.list_space_assets(scenario.id).await.unwrap();
        assert_eq!(assets[0].status, AssetStatus::Operational);

        // At/after t1 but before t2: destroyed.
        seek(&persistence, &broadcast, &scenario, t1, 720.0).await.unwrap();
        let assets = persistence.list_space_assets(scenario.id).await.unwrap();
        assert_eq!(assets[0].status, AssetStatus::Lost);
    }

    #[test]
    fn replaying_same_prefix_twice_is_idempotent() {
        let asset_id = Uuid::new_v4();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 2, 0, 0).unwrap();
        let events = vec![SimEvent {
            id: SimEventId::new(),
            scenario_id: ScenarioId::new(),
            time: t1,
            kind: event_kind::SATELLITE_DESTROYED.to_string(),
            subject_id: Some(asset_id),
            detail: serde_json::json!({}),
        }];

        let first = derive_asset_statuses(&events, t1);
        let second = derive_asset_statuses(&events, t1);
        assert_eq!(first, second);
    }
}
