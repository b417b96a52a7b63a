//! Geographic primitives.
//!
//! Coordinates are WGS84 latitude/longitude in degrees. Distances are
//! great-circle distances in meters.

use serde::{Deserialize, Serialize};

/// A bare coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One fix from the live location stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: LatLng,
    /// Ground speed in m/s as reported by the platform, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_mps: Option<f64>,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { coords: LatLng::new(lat, lng), speed_mps: None }
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }
}

/// Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude, also used for longitude offsets
/// when building the probe grid.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Haversine distance between two points in meters.
pub fn haversine(a: &LatLng, b: &LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Convert a distance in meters to degrees with the flat
/// `1 / 111320` approximation.
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// The center point plus eight neighbours offset by `offset_m` in each
/// cardinal and diagonal direction.
///
/// Order: center, N, S, E, W, NE, NW, SE, SW. Roads lookups use this
/// to catch the road the traveler is on even when the fix drifts.
pub fn probe_grid(center: &LatLng, offset_m: f64) -> [LatLng; 9] {
    let d = meters_to_degrees(offset_m);
    let LatLng { lat, lng } = *center;

    [
        LatLng::new(lat, lng),
        LatLng::new(lat + d, lng),
        LatLng::new(lat - d, lng),
        LatLng::new(lat, lng + d),
        LatLng::new(lat, lng - d),
        LatLng::new(lat + d, lng + d),
        LatLng::new(lat + d, lng - d),
        LatLng::new(lat - d, lng + d),
        LatLng::new(lat - d, lng - d),
    ]
}
