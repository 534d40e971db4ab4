//! Geodesy helpers
//!
//! Great-circle distance, initial bearing and angle normalisation on a
//! spherical earth. Pure functions, no state.

use serde::{Deserialize, Serialize};

/// Conversion constants
pub const NAUTICAL_MILE: f64 = 1852.0;
pub const EARTH_RADIUS_NM: f64 = 3440.065;
pub const KN_TO_MS: f64 = NAUTICAL_MILE / 3600.0;
pub const MS_TO_KN: f64 = 3600.0 / NAUTICAL_MILE;

/// A geographic position in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance to `other` in nautical miles
    pub fn distance_nm(&self, other: &Position) -> f64 {
        distance_nm(self, other)
    }

    /// Initial true bearing to `other` in degrees (0-360)
    pub fn bearing_to(&self, other: &Position) -> f64 {
        bearing_deg(self, other)
    }
}

/// Haversine distance between two positions in nautical miles.
pub fn distance_nm(from: &Position, to: &Position) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lat = (to.latitude - from.latitude).to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_NM * c
}

/// Initial bearing from `from` to `to` in degrees (0-360, true north).
pub fn bearing_deg(from: &Position, to: &Position) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let delta_lon = (to.longitude - from.longitude).to_radians();

    let x = delta_lon.sin() * lat2.cos();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lon.cos();

    normalize_deg(x.atan2(y).to_degrees())
}

/// Wrap an angle into [0, 360)
#[inline]
pub fn normalize_deg(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid(-1e-15) yields 360.0 exactly
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Wrap an angle into [-180, 180)
#[inline]
pub fn wrap_deg_180(angle: f64) -> f64 {
    normalize_deg(angle + 180.0) - 180.0
}

/// Convert a radian angle (as delivered by Signal K) to normalised degrees
#[inline]
pub fn rad_to_deg(angle_rad: f64) -> f64 {
    normalize_deg(angle_rad.to_degrees())
}

/// Offset of `to` relative to `from` in nautical miles (east, north) on a
/// local flat-earth projection. Good enough for the few miles CPA cares about.
pub fn local_offset_nm(from: &Position, to: &Position) -> (f64, f64) {
    let north = (to.latitude - from.latitude) * 60.0;
    let east = wrap_deg_180(to.longitude - from.longitude)
        * 60.0
        * ((from.latitude + to.latitude) / 2.0).to_radians().cos();
    (east, north)
}
