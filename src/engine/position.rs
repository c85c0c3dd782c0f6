//! Position interpolation (§4.5). Piecewise-linear along a mission's
//! waypoint sequence, paced by great-circle segment distance. Pure given a
//! waypoint list, a domain, and an inferred mission start — no I/O, mirrors
//! the treatment `coverage::great_circle_angle_rad` gets as a standalone
//! geometry function.

use chrono::{DateTime, Utc};

use crate::config::defaults::EARTH_RADIUS_KM;
use crate::coverage::great_circle_angle_rad;
use crate::types::{Domain, Waypoint};

const KM_PER_NM: f64 = 1.852;

fn domain_speed_kts(domain: Domain) -> Option<f64> {
    match domain {
        Domain::Air => Some(450.0),
        Domain::Maritime => Some(20.0),
        Domain::Land => Some(120.0),
        Domain::Space => None,
    }
}

fn segment_distance_nm(a: &Waypoint, b: &Waypoint) -> f64 {
    let angle = great_circle_angle_rad(a.lat, a.lon, b.lat, b.lon);
    (angle * EARTH_RADIUS_KM) / KM_PER_NM
}

/// Initial bearing (degrees, `[0, 360)`) from `a` to `b` along the great
/// circle.
fn bearing_deg(a: &Waypoint, b: &Waypoint) -> f64 {
    let (phi1, phi2) = (a.lat.to_radians(), b.lat.to_radians());
    let delta_lambda = (b.lon - a.lon).to_radians();

    let y = delta_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
    let theta = y.atan2(x).to_degrees();
    (theta + 360.0) % 360.0
}

/// A mission's instantaneous position, heading, and speed along its route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutePosition {
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: Option<f64>,
    pub heading_deg: Option<f64>,
    pub speed_kts: f64,
}

/// Total flight time (hours) along `waypoints` at the domain's presumed
/// speed — the `totalFlightTime` the engine's position loop feeds into
/// [`infer_mission_start`]. `None` for domains with no route (SPACE) or
/// routes too short to pace.
pub fn total_flight_hours(waypoints: &[Waypoint], domain: Domain) -> Option<f64> {
    if waypoints.len() < 2 {
        return None;
    }
    let speed_kts = domain_speed_kts(domain)?;
    let total_nm: f64 =
        waypoints.windows(2).map(|pair| segment_distance_nm(&pair[0], &pair[1])).sum();
    Some(total_nm / speed_kts)
}

/// Infer mission start as `firstTimeWindow.start − 0.3·totalFlightTime`
/// (§4.5, §9 open question — kept as the documented heuristic, not
/// parameterized).
pub fn infer_mission_start(
    first_window_start: DateTime<Utc>,
    total_flight_time_hours: f64,
) -> DateTime<Utc> {
    first_window_start - chrono::Duration::milliseconds((total_flight_time_hours * 0.3 * 3_600_000.0) as i64)
}

/// Interpolate a mission's position at `sim_time`. `waypoints` must already
/// be sorted by `sequence`. Returns `None` when the route cannot be paced
/// (fewer than two waypoints, or a domain with no presumed speed — SPACE
/// missions have no route in this model).
pub fn interpolate(
    waypoints: &[Waypoint],
    domain: Domain,
    mission_start: DateTime<Utc>,
    sim_time: DateTime<Utc>,
) -> Option<RoutePosition> {
    if waypoints.len() < 2 {
        return None;
    }
    let speed_kts = domain_speed_kts(domain)?;

    let segment_lengths: Vec<f64> = waypoints
        .windows(2)
        .map(|pair| segment_distance_nm(&pair[0], &pair[1]))
        .collect();
    let total_distance_nm: f64 = segment_lengths.iter().sum();
    if total_distance_nm <= 0.0 {
        let first = &waypoints[0];
        return Some(RoutePosition {
            lat: first.lat,
            lon: first.lon,
            altitude_ft: first.altitude_ft,
            heading_deg: None,
            speed_kts: 0.0,
        });
    }

    let elapsed_hours = (sim_time - mission_start).num_milliseconds() as f64 / 3_600_000.0;

    if elapsed_hours <= 0.0 {
        let first = &waypoints[0];
        return Some(RoutePosition {
            lat: first.lat,
            lon: first.lon,
            altitude_ft: first.altitude_ft,
            heading_deg: Some(bearing_deg(&waypoints[0], &waypoints[1])),
            speed_kts: 0.0,
        });
    }

    let target_distance_nm = elapsed_hours * speed_kts;
    if target_distance_nm >= total_distance_nm {
        let last = waypoints.last().expect("len >= 2 checked above");
        return Some(RoutePosition {
            lat: last.lat,
            lon: last.lon,
            altitude_ft: last.altitude_ft,
            heading_deg: None,
            speed_kts: 0.0,
        });
    }

    let mut cursor = 0.0;
    for (idx, seg_len) in segment_lengths.iter().enumerate() {
        let seg_end = cursor + seg_len;
        if target_distance_nm <= seg_end || idx == segment_lengths.len() - 1 {
            let a = &waypoints[idx];
            let b = &waypoints[idx + 1];
            let frac = if *seg_len > 0.0 {
                ((target_distance_nm - cursor) / seg_len).clamp(0.0, 1.0)
            } else {
                0.0
            };
            return Some(RoutePosition {
                lat: a.lat + (b.lat - a.lat) * frac,
                lon: a.lon + (b.lon - a.lon) * frac,
                altitude_ft: a.altitude_ft.or(b.altitude_ft),
                heading_deg: Some(bearing_deg(a, b)),
                speed_kts,
            });
        }
        cursor = seg_end;
    }

    unreachable!("loop covers [0, total_distance_nm) by construction")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WaypointType;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn wp(seq: i32, lat: f64, lon: f64) -> Waypoint {
        Waypoint {
            id: Uuid::new_v4(),
            mission_id: Default::default(),
            sequence: seq,
            waypoint_type: WaypointType::Cp,
            lat,
            lon,
            altitude_ft: Some(25_000.0),
            speed_kts: None,
        }
    }

    #[test]
    fn before_start_pins_to_first_waypoint_with_zero_speed() {
        let waypoints = vec![wp(1, 0.0, 0.0), wp(2, 1.0, 0.0)];
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let pos = interpolate(&waypoints, Domain::Air, start, start - chrono::Duration::hours(1)).unwrap();
        assert_eq!((pos.lat, pos.lon), (0.0, 0.0));
        assert_eq!(pos.speed_kts, 0.0);
    }

    #[test]
    fn past_route_end_pins_to_last_waypoint_with_zero_speed() {
        let waypoints = vec![wp(1, 0.0, 0.0), wp(2, 1.0, 0.0)];
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let pos = interpolate(&waypoints, Domain::Air, start, start + chrono::Duration::hours(100)).unwrap();
        assert_eq!((pos.lat, pos.lon), (1.0, 0.0));
        assert_eq!(pos.speed_kts, 0.0);
    }

    #[test]
    fn midpoint_in_time_is_between_waypoints() {
        let waypoints = vec![wp(1, 0.0, 0.0), wp(2, 1.0, 0.0)];
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        // total distance ~60 nm at 450 kts takes under 1 minute; sample partway through.
        let total_nm = segment_distance_nm(&waypoints[0], &waypoints[1]);
        let total_hours = total_nm / 450.0;
        let halfway = start + chrono::Duration::milliseconds((total_hours * 0.5 * 3_600_000.0) as i64);
        let pos = interpolate(&waypoints, Domain::Air, start, halfway).unwrap();
        assert!(pos.lat > 0.0 && pos.lat < 1.0);
        assert_eq!(pos.speed_kts, 450.0);
    }

    #[test]
    fn space_domain_has_no_route() {
        let waypoints = vec![wp(1, 0.0, 0.0), wp(2, 1.0, 0.0)];
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert!(interpolate(&waypoints, Domain::Space, start, start).is_none());
    }

    #[test]
    fn single_waypoint_has_no_route() {
        let waypoints = vec![wp(1, 0.0, 0.0)];
        let start = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        assert!(interpolate(&waypoints, Domain::Air, start, start).is_none());
    }
}
