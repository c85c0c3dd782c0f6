//! Space Propagator (§4.1) — pure, stateless position prediction.
//!
//! `position_at` is the single entry point: SGP4 when TLE lines are present
//! (delegated to the `sgp4` crate, the same dependency the orbital-mechanics
//! reference example wraps), an analytic Kepler approximation otherwise.
//! Both paths funnel through one `GeodeticPosition` result type so callers
//! never branch on which path ran.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::defaults::{EARTH_MU_KM3_S2, EARTH_RADIUS_KM, GEO_ALTITUDE_KM};
use crate::types::SpaceAsset;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("invalid TLE: {0}")]
    InvalidTle(String),
    #[error("SGP4 propagation failed: {0}")]
    PropagationFailed(String),
    #[error("asset has neither TLE nor orbital elements")]
    NoOrbitalData,
    #[error("propagated position contains NaN/Inf")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeodeticPosition {
    pub lat: f64,
    pub lon: f64,
    pub alt_km: f64,
    pub vel_km_s: Option<f64>,
}

/// Given an asset and an instant, yield its geodetic sub-satellite point.
/// Returns `None` (per the contract in §4.1) when the instant cannot be
/// propagated at all; returns an error for caller-visible failures so the
/// simulation engine's per-substep error-swallowing policy (§7) has
/// something to log.
pub fn position_at(
    asset: &SpaceAsset,
    instant: DateTime<Utc>,
) -> Result<GeodeticPosition, PropagationError> {
    let pos = if asset.has_tle() {
        sgp4_position(asset, instant)?
    } else if asset.inclination_deg.is_some() && asset.period_min.is_some() {
        analytic_position(asset, instant)?
    } else {
        return Err(PropagationError::NoOrbitalData);
    };

    if !pos.lat.is_finite() || !pos.lon.is_finite() || !pos.alt_km.is_finite() {
        return Err(PropagationError::NonFinite);
    }

    Ok(pos)
}

fn sgp4_position(
    asset: &SpaceAsset,
    instant: DateTime<Utc>,
) -> Result<GeodeticPosition, PropagationError> {
    let line1 = asset.tle_line1.as_deref().unwrap_or_default();
    let line2 = asset.tle_line2.as_deref().unwrap_or_default();

    let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
        .map_err(|e| PropagationError::InvalidTle(format!("{e:?}")))?;

    let constants = sgp4::Constants::from_elements(&elements)
        .map_err(|e| PropagationError::PropagationFailed(format!("{e:?}")))?;

    let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);
    let minutes_since_epoch = (instant - epoch).num_milliseconds() as f64 / 60_000.0;

    let prediction = constants
        .propagate(sgp4::MinutesSinceEpoch(minutes_since_epoch))
        .map_err(|e| PropagationError::PropagationFailed(format!("{e:?}")))?;

    let [x, y, z] = prediction.position;
    let [vx, vy, vz] = prediction.velocity;
    let vel = (vx * vx + vy * vy + vz * vz).sqrt();

    Ok(teme_to_geodetic(x, y, z, instant, Some(vel)))
}

/// TEME (treated as ECI) -> GMST-rotated ECEF -> spherical geodetic.
fn teme_to_geodetic(
    x: f64,
    y: f64,
    z: f64,
    instant: DateTime<Utc>,
    vel_km_s: Option<f64>,
) -> GeodeticPosition {
    let gmst_rad = gmst_radians(instant);
    let (s, c) = gmst_rad.sin_cos();

    let ecef_x = x * c + y * s;
    let ecef_y = -x * s + y * c;
    let ecef_z = z;

    let r_xy = (ecef_x * ecef_x + ecef_y * ecef_y).sqrt();
    let r = (ecef_x * ecef_x + ecef_y * ecef_y + ecef_z * ecef_z).sqrt();

    GeodeticPosition {
        lat: ecef_z.atan2(r_xy).to_degrees(),
        lon: ecef_y.atan2(ecef_x).to_degrees(),
        alt_km: r - EARTH_RADIUS_KM,
        vel_km_s,
    }
}

/// Greenwich Mean Sidereal Time, in radians, via the standard IAU-82 polynomial.
fn gmst_radians(instant: DateTime<Utc>) -> f64 {
    let jd = julian_date(instant);
    let t = (jd - 2_451_545.0) / 36_525.0;

    let gmst_deg = 280.460_618_37
        + 360.985_647_366_29 * (jd - 2_451_545.0)
        + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;

    (gmst_deg.rem_euclid(360.0)).to_radians()
}

fn julian_date(instant: DateTime<Utc>) -> f64 {
    // Days since the Unix epoch (1970-01-01T00:00:00Z = JD 2440587.5).
    let unix_days = instant.timestamp() as f64 / 86_400.0;
    2_440_587.5 + unix_days
}

/// Analytic fallback when no TLE is present (§4.1). Kepler-derived
/// semi-major axis with a GEO-altitude pin for near-24h periods, and a
/// sinusoidal ground-track approximation.
fn analytic_position(
    asset: &SpaceAsset,
    instant: DateTime<Utc>,
) -> Result<GeodeticPosition, PropagationError> {
    let inclination = asset.inclination_deg.ok_or(PropagationError::NoOrbitalData)?;
    let period_min = asset.period_min.ok_or(PropagationError::NoOrbitalData)?;
    let eccentricity = asset.eccentricity.unwrap_or(0.0);
    let base_lon = asset.base_lon.unwrap_or(0.0);

    let period_ms = period_min * 60_000.0;
    // epoch = Unix epoch; "elapsed" is simply the instant's ms timestamp so
    // the phase is deterministic and reproducible across calls.
    let elapsed_ms = instant.timestamp_millis() as f64;
    let phase = 2.0 * std::f64::consts::PI * (elapsed_ms / period_ms);

    let alt_km = if period_min > 1400.0 && period_min < 1500.0 {
        GEO_ALTITUDE_KM
    } else {
        let n = 2.0 * std::f64::consts::PI / (period_min * 60.0); // rad/s
        let a = (EARTH_MU_KM3_S2 / (n * n)).cbrt();
        a - EARTH_RADIUS_KM
    };

    let mut lat = inclination * phase.sin();
    let mut lon = base_lon + eccentricity * 360.0 * phase.cos();

    if lat.abs() > 90.0 {
        lat = if lat >= 0.0 { 180.0 - lat } else { -180.0 - lat };
        lon += 180.0;
        lat = lat.clamp(-90.0, 90.0);
    }

    lon = normalize_longitude(lon);

    Ok(GeodeticPosition {
        lat,
        lon,
        alt_km,
        vel_km_s: None,
    })
}

/// Wrap a longitude value into [-180, 180].
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 {
        180.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Affiliation, AssetStatus};

    fn leo_asset() -> SpaceAsset {
        SpaceAsset {
            id: Default::default(),
            scenario_id: Default::default(),
            name: "TEST-LEO".to_string(),
            constellation: "TEST".to_string(),
            affiliation: Affiliation::Friendly,
            capabilities: vec![],
            tle_line1: None,
            tle_line2: None,
            inclination_deg: Some(53.0),
            period_min: Some(95.0),
            eccentricity: Some(0.001),
            base_lon: Some(-100.0),
            status: AssetStatus::Operational,
        }
    }

    fn geo_asset() -> SpaceAsset {
        SpaceAsset {
            period_min: Some(1436.0),
            inclination_deg: Some(0.5),
            eccentricity: Some(0.0001),
            base_lon: Some(120.0),
            ..leo_asset()
        }
    }

    #[test]
    fn analytic_leo_altitude_matches_kepler() {
        let asset = leo_asset();
        let pos = position_at(&asset, Utc::now()).unwrap();
        // 95-minute LEO should land near the ISS band, not at GEO.
        assert!(pos.alt_km > 300.0 && pos.alt_km < 900.0, "{}", pos.alt_km);
    }

    #[test]
    fn analytic_geo_pins_altitude() {
        let asset = geo_asset();
        let pos = position_at(&asset, Utc::now()).unwrap();
        assert!((pos.alt_km - GEO_ALTITUDE_KM).abs() < 1.0);
    }

    #[test]
    fn longitude_normalizes_into_range() {
        assert!((normalize_longitude(190.0) - (-170.0)).abs() < 1e-9);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_longitude(10.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn no_orbital_data_is_an_error() {
        let mut asset = leo_asset();
        asset.inclination_deg = None;
        asset.period_min = None;
        let err = position_at(&asset, Utc::now()).unwrap_err();
        assert!(matches!(err, PropagationError::NoOrbitalData));
    }
}
