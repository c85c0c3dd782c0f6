//! Scenario-independent reference catalogs (§4.7: "Reference-data steps
//! ... read from a scenario-independent catalog"). Theater bases, the
//! baseline joint force order of battle, and the space constellation are
//! fixed data here rather than LLM output — deterministic and free of the
//! retry/placeholder machinery the authored documents need.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::persistence::{MissionBundle, OrderBundle, PackageBundle};
use crate::types::{
    Affiliation, AssetStatus, CapabilityType, Domain, Mission, MissionCriticality, MissionId,
    MissionPackage, MissionPackageId, MissionStatus, OrderType, ScenarioId, SpaceAsset,
    SpaceAssetId, SpaceNeed, SpaceNeedId, TaskingOrder, TaskingOrderId, TimeWindow, TimeWindowType,
    Waypoint, WaypointType,
};

/// One theater base entry. No dedicated persistence entity in the data
/// model (§3) — consumed in-process by `seed_orbat_bundle` for waypoint
/// placement.
pub struct Base {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

pub static THEATER_BASES: &[(&str, f64, f64)] = &[
    ("Al Udeid AB", 25.117, 51.315),
    ("Incirlik AB", 37.002, 35.426),
    ("Ramstein AB", 49.437, 7.600),
    ("Diego Garcia", -7.313, 72.412),
    ("Andersen AFB", 13.584, 144.930),
];

pub fn theater_bases() -> Vec<Base> {
    THEATER_BASES
        .iter()
        .map(|(name, lat, lon)| Base { name: name.to_string(), lat: *lat, lon: *lon })
        .collect()
}

/// Baseline ato-day-0 order of battle: one OPORD carrying two mission
/// packages (a strike package and an ISR package) so the tick loop and
/// coverage cycle have something to propagate from the first tick.
pub fn seed_orbat_bundle(scenario_id: ScenarioId, scenario_start: DateTime<Utc>) -> OrderBundle {
    let bases = theater_bases();
    let home = &bases[0];
    let forward = bases.get(1).unwrap_or(home);

    let order = TaskingOrder {
        id: TaskingOrderId::new(),
        scenario_id,
        order_type: OrderType::Opord,
        ato_day_number: 0,
        effective_start: scenario_start,
        effective_end: scenario_start + Duration::hours(24),
        planning_doc_id: None,
    };
    let order_id = order.id;

    let strike_package_id = MissionPackageId::new();
    let strike_mission_id = MissionId::new();
    let strike_tot = scenario_start + Duration::hours(6);

    let strike = MissionBundle {
        mission: Mission {
            id: strike_mission_id,
            mission_package_id: strike_package_id,
            mission_id: "STRIKE-01".to_string(),
            callsign: "VIPER 1".to_string(),
            domain: Domain::Air,
            platform_type: "F-15E".to_string(),
            platform_count: 2,
            mission_type: "STRIKE".to_string(),
            status: MissionStatus::Planned,
            affiliation: Affiliation::Friendly,
        },
        waypoints: vec![
            Waypoint {
                id: Uuid::new_v4(),
                mission_id: strike_mission_id,
                sequence: 1,
                waypoint_type: WaypointType::Dep,
                lat: home.lat,
                lon: home.lon,
                altitude_ft: Some(500.0),
                speed_kts: Some(0.0),
            },
            Waypoint {
                id: Uuid::new_v4(),
                mission_id: strike_mission_id,
                sequence: 2,
                waypoint_type: WaypointType::Ip,
                lat: (home.lat + forward.lat) / 2.0,
                lon: (home.lon + forward.lon) / 2.0,
                altitude_ft: Some(28_000.0),
                speed_kts: Some(450.0),
            },
            Waypoint {
                id: Uuid::new_v4(),
                mission_id: strike_mission_id,
                sequence: 3,
                waypoint_type: WaypointType::Tgt,
                lat: forward.lat,
                lon: forward.lon,
                altitude_ft: Some(22_000.0),
                speed_kts: Some(480.0),
            },
            Waypoint {
                id: Uuid::new_v4(),
                mission_id: strike_mission_id,
                sequence: 4,
                waypoint_type: WaypointType::Rec,
                lat: home.lat,
                lon: home.lon,
                altitude_ft: Some(500.0),
                speed_kts: Some(0.0),
            },
        ],
        time_windows: vec![TimeWindow {
            id: Uuid::new_v4(),
            mission_id: strike_mission_id,
            window_type: TimeWindowType::Tot,
            start: strike_tot,
            end: strike_tot + Duration::minutes(15),
        }],
        targets: vec![],
        support_requirements: vec![],
        space_needs: vec![SpaceNeed {
            id: SpaceNeedId::new(),
            mission_id: strike_mission_id,
            capability_type: CapabilityType::Gps,
            priority: 1,
            start_time: strike_tot - Duration::hours(1),
            end_time: strike_tot + Duration::hours(1),
            coverage_lat: Some(forward.lat),
            coverage_lon: Some(forward.lon),
            fallback_capability: Some(CapabilityType::GpsMilitary),
            mission_criticality: MissionCriticality::Critical,
            fulfilled: false,
            strategy_rank: None,
        }],
    };

    let isr_package_id = MissionPackageId::new();
    let isr_mission_id = MissionId::new();
    let isr_start = scenario_start + Duration::hours(2);

    let isr = MissionBundle {
        mission: Mission {
            id: isr_mission_id,
            mission_package_id: isr_package_id,
            mission_id: "ISR-01".to_string(),
            callsign: "SENTRY 1".to_string(),
            domain: Domain::Air,
            platform_type: "RQ-4".to_string(),
            platform_count: 1,
            mission_type: "ISR".to_string(),
            status: MissionStatus::Planned,
            affiliation: Affiliation::Friendly,
        },
        waypoints: vec![
            Waypoint {
                id: Uuid::new_v4(),
                mission_id: isr_mission_id,
                sequence: 1,
                waypoint_type: WaypointType::Dep,
                lat: forward.lat,
                lon: forward.lon,
                altitude_ft: Some(500.0),
                speed_kts: Some(0.0),
            },
            Waypoint {
                id: Uuid::new_v4(),
                mission_id: isr_mission_id,
                sequence: 2,
                waypoint_type: WaypointType::Orbit,
                lat: forward.lat + 1.0,
                lon: forward.lon + 1.0,
                altitude_ft: Some(55_000.0),
                speed_kts: Some(340.0),
            },
        ],
        time_windows: vec![TimeWindow {
            id: Uuid::new_v4(),
            mission_id: isr_mission_id,
            window_type: TimeWindowType::Onsta,
            start: isr_start,
            end: isr_start + Duration::hours(8),
        }],
        targets: vec![],
        support_requirements: vec![],
        space_needs: vec![SpaceNeed {
            id: SpaceNeedId::new(),
            mission_id: isr_mission_id,
            capability_type: CapabilityType::IsrSpace,
            priority: 3,
            start_time: isr_start,
            end_time: isr_start + Duration::hours(8),
            coverage_lat: Some(forward.lat),
            coverage_lon: Some(forward.lon),
            fallback_capability: None,
            mission_criticality: MissionCriticality::Essential,
            fulfilled: false,
            strategy_rank: None,
        }],
    };

    OrderBundle {
        order,
        packages: vec![
            PackageBundle {
                package: MissionPackage {
                    id: strike_package_id,
                    tasking_order_id: order_id,
                    package_id: "PKG-STRIKE-01".to_string(),
                    priority_rank: 1,
                    mission_type: "STRIKE".to_string(),
                    effect_desired: "Neutralize designated target set".to_string(),
                },
                missions: vec![strike],
            },
            PackageBundle {
                package: MissionPackage {
                    id: isr_package_id,
                    tasking_order_id: order_id,
                    package_id: "PKG-ISR-01".to_string(),
                    priority_rank: 2,
                    mission_type: "ISR".to_string(),
                    effect_desired: "Maintain persistent overwatch of objective area".to_string(),
                },
                missions: vec![isr],
            },
        ],
    }
}

/// Baseline space constellation: a mix of LEO and GEO assets spanning most
/// of the capability catalog, seeded with analytic orbital elements (no
/// TLE) so propagation exercises the §4.1 analytic fallback path by
/// default; a live deployment backfills TLEs from the satellite catalog
/// client opportunistically.
pub fn seed_space_assets(scenario_id: ScenarioId) -> Vec<SpaceAsset> {
    vec![
        SpaceAsset {
            id: SpaceAssetId::new(),
            scenario_id,
            name: "NAVSTAR-62".to_string(),
            constellation: "GPS".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![CapabilityType::Gps, CapabilityType::GpsMilitary, CapabilityType::PositionNavTiming],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(55.0),
            period_min: Some(718.0),
            eccentricity: Some(0.01),
            base_lon: Some(-80.0),
            status: AssetStatus::Operational,
        },
        SpaceAsset {
            id: SpaceAssetId::new(),
            scenario_id,
            name: "WGS-9".to_string(),
            constellation: "WGS".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![CapabilityType::Satcom, CapabilityType::SatcomWideband, CapabilityType::CommunicationsRelay],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(0.2),
            period_min: Some(1436.0),
            eccentricity: Some(0.0002),
            base_lon: Some(60.0),
            status: AssetStatus::Operational,
        },
        SpaceAsset {
            id: SpaceAssetId::new(),
            scenario_id,
            name: "AEHF-6".to_string(),
            constellation: "AEHF".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![CapabilityType::SatcomProtected, CapabilityType::TacticalSatcom],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(0.1),
            period_min: Some(1436.0),
            eccentricity: Some(0.0001),
            base_lon: Some(45.0),
            status: AssetStatus::Operational,
        },
        SpaceAsset {
            id: SpaceAssetId::new(),
            scenario_id,
            name: "SBIRS-GEO-5".to_string(),
            constellation: "SBIRS".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![CapabilityType::Opir, CapabilityType::MissileWarning],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(1.5),
            period_min: Some(1436.0),
            eccentricity: Some(0.0003),
            base_lon: Some(55.0),
            status: AssetStatus::Operational,
        },
        SpaceAsset {
            id: SpaceAssetId::new(),
            scenario_id,
            name: "KH-ISR-1".to_string(),
            constellation: "NRO-RECON".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![CapabilityType::IsrSpace, CapabilityType::SpaceDomainAwareness],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(97.6),
            period_min: Some(95.0),
            eccentricity: Some(0.001),
            base_lon: Some(50.0),
            status: AssetStatus::Operational,
        },
        SpaceAsset {
            id: SpaceAssetId::new(),
            scenario_id,
            name: "MUOS-4".to_string(),
            constellation: "MUOS".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![CapabilityType::TacticalSatcom, CapabilityType::Link16],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(3.0),
            period_min: Some(1436.0),
            eccentricity: Some(0.0002),
            base_lon: Some(75.0),
            status: AssetStatus::Operational,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbat_bundle_has_dense_waypoint_sequence() {
        let bundle = seed_orbat_bundle(ScenarioId::new(), Utc::now());
        for package in &bundle.packages {
            for mission in &package.missions {
                let mut sequences: Vec<i32> = mission.waypoints.iter().map(|w| w.sequence).collect();
                sequences.sort_unstable();
                let expected: Vec<i32> = (1..=sequences.len() as i32).collect();
                assert_eq!(sequences, expected);
            }
        }
    }

    #[test]
    fn constellation_covers_multiple_capabilities() {
        let assets = seed_space_assets(ScenarioId::new());
        let caps: std::collections::HashSet<_> =
            assets.iter().flat_map(|a| a.capabilities.iter().copied()).collect();
        assert!(caps.len() >= 5);
    }
}
