//! Coverage cycle (§4.5): every 5th position-loop iteration, re-propagate
//! operational assets, materialize instantaneous coverage windows, persist
//! newly-fulfilled needs, and diff the gap set against the previous cycle to
//! emit `gap:detected`/`gap:resolved`. CRITICAL/DEGRADED gaps additionally
//! raise a `DECISION_REQUIRED` SimEvent with four fixed response options.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::warn;

use crate::broadcast::{BroadcastAdapter, CoverageWindowSummary, Event, GapPayload};
use crate::config::defaults::{COVERAGE_STEP_MIN, DEFAULT_FULFILLMENT_THRESHOLD};
use crate::coverage::{self, CoverageGap};
use crate::persistence::PersistenceLayer;
use crate::types::{
    event_kind, AssetStatus, DecisionOption, GapSeverity, ScenarioId, SimEvent, SimEventId,
    SpaceNeedId,
};

/// Four fixed response options offered alongside every `decision:required`
/// event (§4.5). Labels only — no enforcement of which one an operator
/// eventually picks; this system has no decision-resolution endpoint yet.
fn fixed_decision_options() -> [DecisionOption; 4] {
    [
        DecisionOption {
            label: "Reallocate asset".to_string(),
            description: "Shift coverage from a lower-priority need onto this capability.".to_string(),
        },
        DecisionOption {
            label: "Accept gap".to_string(),
            description: "Continue the mission without this coverage for the remainder of the window.".to_string(),
        },
        DecisionOption {
            label: "Request emergency tasking".to_string(),
            description: "Task an additional asset outside the current ATO cycle.".to_string(),
        },
        DecisionOption {
            label: "Escalate to commander".to_string(),
            description: "Flag the gap for a command decision rather than resolve automatically.".to_string(),
        },
    ]
}

/// Tracks, per scenario, which need ids were gapped as of the previous
/// cycle — the diff basis for `gap:detected`/`gap:resolved`.
#[derive(Default)]
pub struct GapTracker {
    previous: std::collections::HashMap<ScenarioId, HashSet<SpaceNeedId>>,
}

impl GapTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forget(&mut self, scenario_id: ScenarioId) {
        self.previous.remove(&scenario_id);
    }
}

/// Run one coverage cycle for `scenario_id` at `sim_time`. `window_duration`
/// is the instantaneous-window duration to materialize
/// (`positionUpdateIntervalMs · 5 · compressionRatio`, per §4.5).
pub async fn run(
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    tracker: &mut GapTracker,
    scenario_id: ScenarioId,
    sim_time: DateTime<Utc>,
    window_duration: Duration,
) {
    let assets = match persistence.list_space_assets(scenario_id).await {
        Ok(a) => a,
        Err(err) => {
            warn!(scenario_id = %scenario_id, error = %err, "coverage cycle: failed to load assets");
            return;
        }
    };
    let operational: Vec<_> = assets.into_iter().filter(|a| a.status == AssetStatus::Operational).collect();

    let active_needs = match persistence.list_active_space_needs(scenario_id, sim_time).await {
        Ok(n) => n,
        Err(err) => {
            warn!(scenario_id = %scenario_id, error = %err, "coverage cycle: failed to load active needs");
            return;
        }
    };
    if operational.is_empty() && active_needs.is_empty() {
        return;
    }

    let cycle_start = sim_time - window_duration;
    let mut all_windows = Vec::new();
    let mut summaries = Vec::new();

    for asset in &operational {
        for need in &active_needs {
            let (Some(lat), Some(lon)) = (need.coverage_lat, need.coverage_lon) else { continue };
            if !asset.capabilities.contains(&need.capability_type) {
                continue;
            }
            let windows = coverage::compute_coverage_windows(
                asset,
                lat,
                lon,
                cycle_start,
                sim_time,
                COVERAGE_STEP_MIN,
            );
            for w in &windows {
                summaries.push(CoverageWindowSummary {
                    asset_id: asset.id,
                    asset_name: asset.name.clone(),
                    capability: w.capability_type,
                    start: w.start,
                    end: w.end,
                    elevation: w.max_elevation_deg,
                    lat: w.center_lat,
                    lon: w.center_lon,
                });
            }
            all_windows.extend(windows);
        }
    }

    if let Err(err) = persistence.insert_coverage_windows(&all_windows).await {
        warn!(scenario_id = %scenario_id, error = %err, "coverage cycle: failed to persist coverage windows");
    }

    if !summaries.is_empty() {
        broadcast.emit(scenario_id, Event::SpaceCoverage { timestamp: sim_time, windows: summaries });
    }

    let newly_fulfilled =
        coverage::check_fulfillment(&active_needs, &all_windows, DEFAULT_FULFILLMENT_THRESHOLD);
    if !newly_fulfilled.is_empty() {
        if let Err(err) = persistence.mark_needs_fulfilled(&newly_fulfilled).await {
            warn!(scenario_id = %scenario_id, error = %err, "coverage cycle: failed to mark needs fulfilled");
        }
    }

    let gaps = coverage::detect_gaps(&active_needs, &all_windows);
    let current_gapped: HashSet<SpaceNeedId> = gaps.iter().map(|g| g.need_id).collect();
    let previously_gapped = tracker.previous.entry(scenario_id).or_default().clone();

    for gap in &gaps {
        if !previously_gapped.contains(&gap.need_id) {
            broadcast.emit(scenario_id, Event::GapDetected { timestamp: sim_time, gap: to_payload(gap, &active_needs) });

            if matches!(gap.severity, GapSeverity::Critical | GapSeverity::Degraded) {
                raise_decision(persistence, broadcast, scenario_id, sim_time, gap, &active_needs).await;
            }
        }
    }
    for resolved_id in previously_gapped.difference(&current_gapped) {
        if let Some(need) = active_needs.iter().find(|n| n.id == *resolved_id) {
            broadcast.emit(
                scenario_id,
                Event::GapResolved {
                    timestamp: sim_time,
                    gap: GapPayload {
                        mission_id: Some(need.mission_id),
                        capability: need.capability_type,
                        start: need.start_time,
                        end: need.end_time,
                        severity: GapSeverity::Low,
                        priority: need.priority,
                    },
                },
            );
        }
    }

    tracker.previous.insert(scenario_id, current_gapped);
}

fn to_payload(gap: &CoverageGap, needs: &[crate::types::SpaceNeed]) -> GapPayload {
    let mission_id = needs.iter().find(|n| n.id == gap.need_id).map(|n| n.mission_id);
    GapPayload {
        mission_id,
        capability: gap.capability,
        start: gap.start,
        end: gap.end,
        severity: gap.severity,
        priority: gap.priority,
    }
}

async fn raise_decision(
    persistence: &dyn PersistenceLayer,
    broadcast: &BroadcastAdapter,
    scenario_id: ScenarioId,
    sim_time: DateTime<Utc>,
    gap: &CoverageGap,
    needs: &[crate::types::SpaceNeed],
) {
    let mission_id = needs.iter().find(|n| n.id == gap.need_id).map(|n| n.mission_id);
    let decision_id = uuid::Uuid::new_v4();
    let options = fixed_decision_options();

    let event = SimEvent {
        id: SimEventId::new(),
        scenario_id,
        time: sim_time,
        kind: event_kind::DECISION_REQUIRED.to_string(),
        subject_id: mission_id.map(|m| m.0),
        detail: json!({
            "decisionId": decision_id,
            "severity": gap.severity,
            "capability": gap.capability,
            "gapStart": gap.start,
            "gapEnd": gap.end,
        }),
    };
    if let Err(err) = persistence.append_sim_event(&event).await {
        warn!(scenario_id = %scenario_id, error = %err, "failed to persist decision-required event");
    }

    broadcast.emit(
        scenario_id,
        Event::DecisionRequired {
            decision_id,
            severity: gap.severity,
            capability: gap.capability,
            mission_id,
            gap_start: gap.start,
            gap_end: gap.end,
            options,
        },
    );
}
