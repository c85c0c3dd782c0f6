//! Space Allocator (§4.3) — contention grouping and resolution across
//! competing space needs for a single ATO day. Pure over its inputs; the
//! caller (`game_master`/`engine`) is responsible for assembling the needs
//! and assets from persistence.

use serde::{Deserialize, Serialize};

use crate::types::{
    AllocationStatus, CapabilityType, MissionCriticality, RiskLevel, SpaceAsset,
    SpaceCoverageWindow, SpaceNeed, SpaceNeedId,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    pub need_id: SpaceNeedId,
    pub status: AllocationStatus,
    /// Capability actually allocated — equals the need's own capability when
    /// FULFILLED, the need's `fallback_capability` when DEGRADED, absent
    /// when DENIED.
    pub allocated_capability: Option<CapabilityType>,
    pub asset_id: Option<crate::types::SpaceAssetId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contention {
    pub capability: CapabilityType,
    pub need_ids: Vec<SpaceNeedId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSummary {
    pub total_needs: usize,
    pub fulfilled: usize,
    pub degraded: usize,
    pub denied: usize,
    pub contention: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationReport {
    pub allocations: Vec<Allocation>,
    pub contentions: Vec<Contention>,
    pub summary: AllocationSummary,
}

/// One need annotated with the metadata the resolver ranks on. Construction
/// (joining a need to its package's `priority_rank` and any linked
/// `StrategyPriority.rank`) is the caller's job — this module only resolves
/// already-annotated needs.
#[derive(Debug, Clone)]
pub struct AnnotatedNeed {
    pub need: SpaceNeed,
    pub package_priority: i32,
}

impl AnnotatedNeed {
    fn strategy_rank(&self) -> i32 {
        self.need.strategy_rank.unwrap_or(i32::MAX)
    }
}

/// Rank competitors within a contention group: ascending strategy-traced
/// rank, then by criticality (CRITICAL < ESSENTIAL < ENHANCING < ROUTINE),
/// then by package priority, then by need priority (§4.3 step 4).
fn competitor_order(a: &AnnotatedNeed, b: &AnnotatedNeed) -> std::cmp::Ordering {
    a.strategy_rank()
        .cmp(&b.strategy_rank())
        .then_with(|| a.need.mission_criticality.cmp(&b.need.mission_criticality))
        .then_with(|| a.package_priority.cmp(&b.package_priority))
        .then_with(|| a.need.priority.cmp(&b.need.priority))
}

/// Group needs by capability; within a capability, two needs belong to the
/// same contention group iff their time windows overlap (transitively — a
/// group's window extends to the latest end of any member, §4.3 step 2).
fn group_by_contention(needs: &[AnnotatedNeed]) -> Vec<Vec<usize>> {
    let mut by_capability: std::collections::HashMap<CapabilityType, Vec<usize>> =
        std::collections::HashMap::new();
    for (idx, n) in needs.iter().enumerate() {
        by_capability.entry(n.need.capability_type).or_default().push(idx);
    }

    let mut groups = Vec::new();
    for (_, mut indices) in by_capability {
        indices.sort_by_key(|&i| needs[i].need.start_time);

        let mut current: Vec<usize> = Vec::new();
        let mut current_end = None;

        for idx in indices {
            let n = &needs[idx];
            match current_end {
                Some(end) if n.need.start_time < end => {
                    current.push(idx);
                    current_end = Some(end.max(n.need.end_time));
                }
                _ => {
                    if !current.is_empty() {
                        groups.push(std::mem::take(&mut current));
                    }
                    current.push(idx);
                    current_end = Some(n.need.end_time);
                }
            }
        }
        if !current.is_empty() {
            groups.push(current);
        }
    }
    groups
}

/// An asset supplies a need iff it carries the capability and has a
/// coverage window for that capability overlapping the need (§4.3 step 3).
fn asset_supplies(
    asset: &SpaceAsset,
    capability: CapabilityType,
    need: &SpaceNeed,
    windows: &[SpaceCoverageWindow],
) -> bool {
    asset.capabilities.contains(&capability)
        && windows.iter().any(|w| {
            w.asset_id == asset.id
                && w.capability_type == capability
                && w.start < need.end_time
                && need.start_time < w.end
        })
}

fn find_supplier(
    assets: &[SpaceAsset],
    capability: CapabilityType,
    need: &SpaceNeed,
    windows: &[SpaceCoverageWindow],
) -> Option<crate::types::SpaceAssetId> {
    assets
        .iter()
        .find(|a| asset_supplies(a, capability, need, windows))
        .map(|a| a.id)
}

/// Resolve allocation for every need belonging to a single ATO day's mission
/// set, given the scenario's space assets and materialized coverage windows.
pub fn allocate(
    needs: Vec<AnnotatedNeed>,
    assets: &[SpaceAsset],
    windows: &[SpaceCoverageWindow],
) -> AllocationReport {
    let total_needs = needs.len();
    let groups = group_by_contention(&needs);
    let mut contended: std::collections::HashSet<usize> = std::collections::HashSet::new();
    for g in &groups {
        if g.len() > 1 {
            contended.extend(g.iter().copied());
        }
    }

    let mut allocations = vec![None; needs.len()];
    let mut contentions = Vec::new();

    for group in &groups {
        if group.len() <= 1 {
            continue;
        }
        let capability = needs[group[0]].need.capability_type;
        contentions.push(Contention {
            capability,
            need_ids: group.iter().map(|&i| needs[i].need.id).collect(),
        });

        let mut ranked = group.clone();
        ranked.sort_by(|&a, &b| competitor_order(&needs[a], &needs[b]));

        for (rank, &idx) in ranked.iter().enumerate() {
            let need = &needs[idx].need;
            if rank == 0 {
                let supplier = find_supplier(assets, capability, need, windows);
                allocations[idx] = Some(if let Some(asset_id) = supplier {
                    Allocation {
                        need_id: need.id,
                        status: AllocationStatus::Fulfilled,
                        allocated_capability: Some(capability),
                        asset_id: Some(asset_id),
                    }
                } else {
                    Allocation {
                        need_id: need.id,
                        status: AllocationStatus::Denied,
                        allocated_capability: None,
                        asset_id: None,
                    }
                });
            } else if let Some(fallback) = need.fallback_capability {
                let supplier = find_supplier(assets, fallback, need, windows);
                allocations[idx] = Some(Allocation {
                    need_id: need.id,
                    status: AllocationStatus::Degraded,
                    allocated_capability: Some(fallback),
                    asset_id: supplier,
                });
            } else {
                allocations[idx] = Some(Allocation {
                    need_id: need.id,
                    status: AllocationStatus::Denied,
                    allocated_capability: None,
                    asset_id: None,
                });
            }
        }
    }

    // Non-contended needs (§4.3 step 5).
    for (idx, annotated) in needs.iter().enumerate() {
        if contended.contains(&idx) {
            continue;
        }
        let capability = annotated.need.capability_type;
        let supplier = find_supplier(assets, capability, &annotated.need, windows);
        allocations[idx] = Some(if let Some(asset_id) = supplier {
            Allocation {
                need_id: annotated.need.id,
                status: AllocationStatus::Fulfilled,
                allocated_capability: Some(capability),
                asset_id: Some(asset_id),
            }
        } else {
            Allocation {
                need_id: annotated.need.id,
                status: AllocationStatus::Denied,
                allocated_capability: None,
                asset_id: None,
            }
        });
    }

    let allocations: Vec<Allocation> = allocations.into_iter().flatten().collect();

    let fulfilled = allocations
        .iter()
        .filter(|a| a.status == AllocationStatus::Fulfilled)
        .count();
    let degraded = allocations
        .iter()
        .filter(|a| a.status == AllocationStatus::Degraded)
        .count();
    let denied = allocations
        .iter()
        .filter(|a| a.status == AllocationStatus::Denied)
        .count();

    let any_critical_denied = allocations.iter().any(|a| {
        a.status == AllocationStatus::Denied
            && needs
                .iter()
                .find(|n| n.need.id == a.need_id)
                .map(|n| n.need.mission_criticality == MissionCriticality::Critical)
                .unwrap_or(false)
    });

    let risk_level = if any_critical_denied {
        RiskLevel::Critical
    } else if denied > 0 {
        RiskLevel::High
    } else if degraded > 0 {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    };

    AllocationReport {
        allocations,
        contentions,
        summary: AllocationSummary {
            total_needs,
            fulfilled,
            degraded,
            denied,
            contention: contended.len(),
            risk_level,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Affiliation, AssetStatus};
    use chrono::{Duration, TimeZone, Utc};

    fn need(
        priority: i32,
        strategy_rank: Option<i32>,
        criticality: MissionCriticality,
        fallback: Option<CapabilityType>,
    ) -> SpaceNeed {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        SpaceNeed {
            id: Default::default(),
            mission_id: Default::default(),
            capability_type: CapabilityType::Gps,
            priority,
            start_time: start,
            end_time: start + Duration::hours(2),
            coverage_lat: Some(10.0),
            coverage_lon: Some(10.0),
            fallback_capability: fallback,
            mission_criticality: criticality,
            fulfilled: false,
            strategy_rank,
        }
    }

    fn supplying_asset(capability: CapabilityType) -> SpaceAsset {
        SpaceAsset {
            id: Default::default(),
            scenario_id: Default::default(),
            name: "ASSET".into(),
            constellation: "C".into(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![capability],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(53.0),
            period_min: Some(95.0),
            eccentricity: Some(0.0),
            base_lon: Some(0.0),
            status: AssetStatus::Operational,
        }
    }

    fn covering_window(asset: &SpaceAsset, capability: CapabilityType) -> SpaceCoverageWindow {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        SpaceCoverageWindow {
            id: uuid::Uuid::new_v4(),
            asset_id: asset.id,
            capability_type: capability,
            start: start - Duration::hours(1),
            end: start + Duration::hours(4),
            max_elevation_deg: 40.0,
            center_lat: 10.0,
            center_lon: 10.0,
            swath_width_km: 1000.0,
        }
    }

    #[test]
    fn contention_resolution_prefers_strategy_rank() {
        let a = need(2, Some(1), MissionCriticality::Essential, None);
        let b = need(1, Some(3), MissionCriticality::Essential, Some(CapabilityType::GpsMilitary));
        let asset = supplying_asset(CapabilityType::Gps);
        let fallback_asset = supplying_asset(CapabilityType::GpsMilitary);
        let windows = vec![
            covering_window(&asset, CapabilityType::Gps),
            covering_window(&fallback_asset, CapabilityType::GpsMilitary),
        ];
        let assets = vec![asset, fallback_asset];

        let report = allocate(
            vec![
                AnnotatedNeed { need: a.clone(), package_priority: 1 },
                AnnotatedNeed { need: b.clone(), package_priority: 1 },
            ],
            &assets,
            &windows,
        );

        let alloc_a = report.allocations.iter().find(|x| x.need_id == a.id).unwrap();
        let alloc_b = report.allocations.iter().find(|x| x.need_id == b.id).unwrap();
        assert_eq!(alloc_a.status, AllocationStatus::Fulfilled);
        assert_eq!(alloc_b.status, AllocationStatus::Degraded);
        assert_eq!(alloc_b.allocated_capability, Some(CapabilityType::GpsMilitary));
    }

    #[test]
    fn criticality_tiebreaker_at_equal_strategy_rank() {
        let critical = need(5, Some(1), MissionCriticality::Critical, None);
        let essential = need(1, Some(1), MissionCriticality::Essential, None);
        let asset = supplying_asset(CapabilityType::Gps);
        let windows = vec![covering_window(&asset, CapabilityType::Gps)];

        let report = allocate(
            vec![
                AnnotatedNeed { need: essential.clone(), package_priority: 1 },
                AnnotatedNeed { need: critical.clone(), package_priority: 1 },
            ],
            &[asset],
            &windows,
        );

        let alloc_critical = report.allocations.iter().find(|x| x.need_id == critical.id).unwrap();
        assert_eq!(alloc_critical.status, AllocationStatus::Fulfilled);
    }

    #[test]
    fn risk_level_critical_when_critical_need_denied() {
        let critical = need(1, Some(1), MissionCriticality::Critical, None);
        // No supplying asset at all -> denied.
        let report = allocate(
            vec![AnnotatedNeed { need: critical, package_priority: 1 }],
            &[],
            &[],
        );
        assert_eq!(report.summary.risk_level, RiskLevel::Critical);
        assert_eq!(report.summary.denied, 1);
    }
}
