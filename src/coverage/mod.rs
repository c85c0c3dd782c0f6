//! Coverage Calculator (§4.2) — pure, stateless geometry over satellite
//! sub-points and ground needs. No I/O; every function here is a candidate
//! for the teacher's `physics_engine/models.rs`-style "pure calculation,
//! heavily unit tested" treatment.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::defaults::EARTH_RADIUS_KM;
use crate::propagation::{self, GeodeticPosition, PropagationError};
use crate::types::{
    CapabilityType, GapSeverity, SpaceAsset, SpaceCoverageWindow, SpaceNeed, SpaceNeedId,
};

/// Minimum elevation, in degrees, at which a capability is considered "in
/// coverage" (§4.2). Fixed by design — not configurable per scenario.
pub fn min_elevation_deg(capability: CapabilityType) -> f64 {
    use CapabilityType::*;
    match capability {
        Gps | GpsMilitary | PositionNavTiming => 5.0,
        Satcom | SatcomWideband | TacticalSatcom | CommunicationsRelay => 5.0,
        SatcomProtected | Opir | MissileWarning | NuclearDetection => 10.0,
        IsrSpace | SpaceDomainAwareness => 20.0,
        SigintSpace | WeatherSpace => 15.0,
        Link16 | CyberSpace | Navwar => 0.0,
    }
}

/// Great-circle central angle between two geodetic points, in radians,
/// `[0, pi]`. Vincenty's formula for the angular separation — numerically
/// stable near antipodal and coincident points, unlike a bare law-of-cosines
/// `acos`.
pub fn great_circle_angle_rad(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let delta_lambda = (lon2 - lon1).to_radians();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let sin_phi2 = phi2.sin();
    let cos_phi2 = phi2.cos();
    let (sin_dl, cos_dl) = delta_lambda.sin_cos();

    let numerator = ((cos_phi2 * sin_dl).powi(2)
        + (cos_phi1 * sin_phi2 - sin_phi1 * cos_phi2 * cos_dl).powi(2))
    .sqrt();
    let denominator = sin_phi1 * sin_phi2 + cos_phi1 * cos_phi2 * cos_dl;

    numerator.atan2(denominator)
}

/// Result of a single-instant coverage check (§4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoverageCheck {
    pub in_coverage: bool,
    pub elevation_deg: f64,
    pub slant_range_km: f64,
    pub sub_sat_lat: f64,
    pub sub_sat_lon: f64,
    pub alt_km: f64,
}

/// Elevation angle and slant range from a ground point to a satellite
/// sub-point, and whether that clears the capability's minimum elevation.
pub fn check_coverage(
    sat_pos: GeodeticPosition,
    ground_lat: f64,
    ground_lon: f64,
    capability: CapabilityType,
) -> CoverageCheck {
    let c = great_circle_angle_rad(ground_lat, ground_lon, sat_pos.lat, sat_pos.lon);
    let r = EARTH_RADIUS_KM;
    let h = sat_pos.alt_km;

    let elevation_rad = (c.cos() - r / (r + h)).atan2(c.sin());
    let elevation_deg = elevation_rad.to_degrees();

    let slant_range_km =
        (r * r + (r + h) * (r + h) - 2.0 * r * (r + h) * c.cos()).max(0.0).sqrt();

    CoverageCheck {
        in_coverage: elevation_deg >= min_elevation_deg(capability),
        elevation_deg,
        slant_range_km,
        sub_sat_lat: sat_pos.lat,
        sub_sat_lon: sat_pos.lon,
        alt_km: h,
    }
}

/// Walk `[start, end]` in `step_min`-minute steps, tracking an AOS/LOS
/// window per capability on `asset`. Propagation failures at a given step
/// are skipped (treated as "no coverage that instant") rather than aborting
/// the whole walk — a single bad sample shouldn't erase the rest of the
/// pass.
pub fn compute_coverage_windows(
    asset: &SpaceAsset,
    ground_lat: f64,
    ground_lon: f64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step_min: i64,
) -> Vec<SpaceCoverageWindow> {
    let mut windows = Vec::new();
    let step = Duration::minutes(step_min.max(1));

    for &capability in &asset.capabilities {
        let mut active: Option<Active> = None;
        let mut t = start;

        while t <= end {
            let sample: Result<GeodeticPosition, PropagationError> =
                propagation::position_at(asset, t);

            let check = sample
                .ok()
                .map(|pos| check_coverage(pos, ground_lat, ground_lon, capability));

            match (&mut active, check) {
                (None, Some(c)) if c.in_coverage => {
                    active = Some(Active {
                        start: t,
                        peak_elevation: c.elevation_deg,
                        center_lat: c.sub_sat_lat,
                        center_lon: c.sub_sat_lon,
                    });
                }
                (Some(a), Some(c)) if c.in_coverage => {
                    if c.elevation_deg > a.peak_elevation {
                        a.peak_elevation = c.elevation_deg;
                        a.center_lat = c.sub_sat_lat;
                        a.center_lon = c.sub_sat_lon;
                    }
                }
                (Some(a), _) => {
                    windows.push(close_window(asset, capability, a, t));
                    active = None;
                }
                (None, _) => {}
            }

            t += step;
        }

        if let Some(a) = active {
            windows.push(close_window(asset, capability, &a, end));
        }
    }

    windows
}

struct Active {
    start: DateTime<Utc>,
    peak_elevation: f64,
    center_lat: f64,
    center_lon: f64,
}

fn close_window(
    asset: &SpaceAsset,
    capability: CapabilityType,
    active: &Active,
    closed_at: DateTime<Utc>,
) -> SpaceCoverageWindow {
    SpaceCoverageWindow {
        id: Uuid::new_v4(),
        asset_id: asset.id,
        capability_type: capability,
        start: active.start,
        end: closed_at,
        max_elevation_deg: active.peak_elevation,
        center_lat: active.center_lat,
        center_lon: active.center_lon,
        swath_width_km: swath_width_km(active.peak_elevation),
    }
}

/// Rough ground-footprint width at a given peak elevation: higher elevation
/// passes overhead (narrow swath at the moment of closest approach is
/// irrelevant here — this approximates the visible footprint diameter).
fn swath_width_km(peak_elevation_deg: f64) -> f64 {
    let h = 2.0 * EARTH_RADIUS_KM;
    h * (1.0 - (peak_elevation_deg.to_radians().sin())).max(0.05)
}

/// A single uncovered interval for a capability need (§4.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageGap {
    pub need_id: SpaceNeedId,
    pub capability: CapabilityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub severity: GapSeverity,
    pub priority: i32,
}

fn severity_for_priority(priority: i32) -> GapSeverity {
    if priority <= 1 {
        GapSeverity::Critical
    } else if priority <= 3 {
        GapSeverity::Degraded
    } else {
        GapSeverity::Low
    }
}

/// For every unfulfilled need with a coverage point, find matching-capability
/// windows overlapping the need's time window and emit gap segments for
/// every uncovered interval, including the head and tail. Needs with no
/// coverage point (`coverage_lat`/`coverage_lon` absent) are skipped — there
/// is no ground reference to compute a gap against. Output is sorted by
/// severity (CRITICAL first) then priority.
pub fn detect_gaps(needs: &[SpaceNeed], windows: &[SpaceCoverageWindow]) -> Vec<CoverageGap> {
    let mut gaps = Vec::new();

    for need in needs {
        if need.fulfilled {
            continue;
        }
        if need.coverage_lat.is_none() || need.coverage_lon.is_none() {
            continue;
        }

        let mut matching: Vec<&SpaceCoverageWindow> = windows
            .iter()
            .filter(|w| w.capability_type == need.capability_type)
            .filter(|w| w.start < need.end_time && need.start_time < w.end)
            .collect();
        matching.sort_by_key(|w| w.start);

        if matching.is_empty() {
            gaps.push(CoverageGap {
                need_id: need.id,
                capability: need.capability_type,
                start: need.start_time,
                end: need.end_time,
                severity: severity_for_priority(need.priority),
                priority: need.priority,
            });
            continue;
        }

        let mut cursor = need.start_time;
        for w in &matching {
            let seg_start = w.start.max(need.start_time);
            if seg_start > cursor {
                gaps.push(CoverageGap {
                    need_id: need.id,
                    capability: need.capability_type,
                    start: cursor,
                    end: seg_start,
                    severity: severity_for_priority(need.priority),
                    priority: need.priority,
                });
            }
            let seg_end = w.end.min(need.end_time);
            if seg_end > cursor {
                cursor = seg_end;
            }
        }
        if cursor < need.end_time {
            gaps.push(CoverageGap {
                need_id: need.id,
                capability: need.capability_type,
                start: cursor,
                end: need.end_time,
                severity: severity_for_priority(need.priority),
                priority: need.priority,
            });
        }
    }

    gaps.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(a.priority.cmp(&b.priority))
    });
    gaps
}

/// Sum overlap durations of matching-capability windows, clamped to each
/// need's window, and return the ids of needs newly crossing `threshold`
/// (§4.2). Already-fulfilled needs are skipped — fulfillment only moves
/// forward, never re-evaluated away (monotonicity, §8).
pub fn check_fulfillment(
    needs: &[SpaceNeed],
    windows: &[SpaceCoverageWindow],
    threshold: f64,
) -> Vec<SpaceNeedId> {
    let mut newly_fulfilled = Vec::new();

    for need in needs {
        if need.fulfilled {
            continue;
        }

        let covered: Duration = windows
            .iter()
            .filter(|w| w.capability_type == need.capability_type)
            .map(|w| w.overlap_with(need.start_time, need.end_time))
            .fold(Duration::zero(), |acc, d| acc + d);

        let total = need.duration();
        if total.num_milliseconds() <= 0 {
            continue;
        }

        let ratio = covered.num_milliseconds() as f64 / total.num_milliseconds() as f64;
        if ratio >= threshold {
            newly_fulfilled.push(need.id);
        }
    }

    newly_fulfilled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Affiliation, AssetStatus, MissionCriticality};
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    #[test]
    fn great_circle_coincident_is_zero() {
        assert_abs_diff_eq!(great_circle_angle_rad(10.0, 20.0, 10.0, 20.0), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn great_circle_antipodal_is_pi() {
        let angle = great_circle_angle_rad(0.0, 0.0, 0.0, 180.0);
        assert_abs_diff_eq!(angle, std::f64::consts::PI, epsilon = 1e-5);

        let angle2 = great_circle_angle_rad(90.0, 0.0, -90.0, 0.0);
        assert_abs_diff_eq!(angle2, std::f64::consts::PI, epsilon = 1e-5);
    }

    #[test]
    fn great_circle_quarter_turn_on_equator() {
        let angle = great_circle_angle_rad(0.0, 0.0, 0.0, 90.0);
        assert_abs_diff_eq!(angle, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn leo_gps_coverage_is_in_range() {
        let sat = GeodeticPosition {
            lat: 35.0,
            lon: -100.0,
            alt_km: 408.0,
            vel_km_s: None,
        };
        let check = check_coverage(sat, 34.0, -101.0, CapabilityType::Gps);
        assert!(check.in_coverage);
        assert!(check.elevation_deg > 5.0);
        assert!(check.slant_range_km > 0.0);
    }

    #[test]
    fn geo_satcom_reaches_far_ground_point() {
        let sat = GeodeticPosition {
            lat: 0.5,
            lon: 120.0,
            alt_km: 35_786.0,
            vel_km_s: None,
        };
        let check = check_coverage(sat, 15.0, 130.0, CapabilityType::Satcom);
        assert!(check.in_coverage);
        assert_abs_diff_eq!(check.alt_km, 35_786.0, epsilon = 1e-6);
    }

    #[test]
    fn gap_with_no_coverage_windows_is_critical() {
        let need = SpaceNeed {
            id: Default::default(),
            mission_id: Default::default(),
            capability_type: CapabilityType::Gps,
            priority: 1,
            start_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 1, 1, 6, 0, 0).unwrap(),
            coverage_lat: Some(34.0),
            coverage_lon: Some(-101.0),
            fallback_capability: None,
            mission_criticality: MissionCriticality::Critical,
            fulfilled: false,
            strategy_rank: None,
        };
        let gaps = detect_gaps(&[need], &[]);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].severity, GapSeverity::Critical);
    }

    #[test]
    fn fulfillment_below_threshold_is_not_fulfilled() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let need = SpaceNeed {
            id: Default::default(),
            mission_id: Default::default(),
            capability_type: CapabilityType::Gps,
            priority: 5,
            start_time: start,
            end_time: start + Duration::hours(6),
            coverage_lat: Some(34.0),
            coverage_lon: Some(-101.0),
            fallback_capability: None,
            mission_criticality: MissionCriticality::Routine,
            fulfilled: false,
            strategy_rank: None,
        };
        let window = SpaceCoverageWindow {
            id: Uuid::new_v4(),
            asset_id: Default::default(),
            capability_type: CapabilityType::Gps,
            start,
            end: start + Duration::hours(1),
            max_elevation_deg: 30.0,
            center_lat: 34.0,
            center_lon: -101.0,
            swath_width_km: 1000.0,
        };
        let newly = check_fulfillment(&[need], &[window], 0.8);
        assert!(newly.is_empty());
    }

    #[test]
    fn full_span_coverage_yields_no_gaps() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::hours(2);
        let need = SpaceNeed {
            id: Default::default(),
            mission_id: Default::default(),
            capability_type: CapabilityType::Link16,
            priority: 2,
            start_time: start,
            end_time: end,
            coverage_lat: Some(0.0),
            coverage_lon: Some(0.0),
            fallback_capability: None,
            mission_criticality: MissionCriticality::Essential,
            fulfilled: false,
            strategy_rank: None,
        };
        let window = SpaceCoverageWindow {
            id: Uuid::new_v4(),
            asset_id: Default::default(),
            capability_type: CapabilityType::Link16,
            start: start - Duration::minutes(5),
            end: end + Duration::minutes(5),
            max_elevation_deg: 45.0,
            center_lat: 0.0,
            center_lon: 0.0,
            swath_width_km: 500.0,
        };
        let gaps = detect_gaps(&[need], &[window]);
        assert!(gaps.is_empty());
    }

    fn leo_asset_with(capabilities: Vec<CapabilityType>) -> SpaceAsset {
        SpaceAsset {
            id: Default::default(),
            scenario_id: Default::default(),
            name: "TEST".into(),
            constellation: "TEST".into(),
            affiliation: Affiliation::Friendly,
            capabilities,
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(53.0),
            period_min: Some(95.0),
            eccentricity: Some(0.001),
            base_lon: Some(-100.0),
            status: AssetStatus::Operational,
        }
    }

    #[test]
    fn coverage_windows_are_start_before_end_and_sorted() {
        let asset = leo_asset_with(vec![CapabilityType::Link16]);
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::hours(3);
        let windows = compute_coverage_windows(&asset, 0.0, -100.0, start, end, 1);
        for w in &windows {
            assert!(w.start <= w.end);
        }
        for pair in windows.windows(2) {
            assert!(pair[0].start <= pair[1].start);
        }
    }
}
