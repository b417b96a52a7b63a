//! Google encoded polyline decoding.
//!
//! Each coordinate is stored as a zig-zag varint delta from the previous
//! one, scaled by 1e5, in 5-bit chunks offset by 63 into printable ASCII.

use crate::error::{NavError, Result};
use crate::geo::LatLng;

const PRECISION: f64 = 1e5;

/// Decode an encoded polyline into its coordinates.
pub fn decode(encoded: &str) -> Result<Vec<LatLng>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        lat = accumulate(lat, next_delta(bytes, &mut index)?)?;
        lng = accumulate(lng, next_delta(bytes, &mut index)?)?;
        points.push(LatLng::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Ok(points)
}

fn accumulate(value: i64, delta: i64) -> Result<i64> {
    value
        .checked_add(delta)
        .ok_or_else(|| NavError::InvalidInput("polyline coordinate overflow".into()))
}

/// Read one varint-encoded signed delta starting at `index`.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| NavError::InvalidInput("truncated polyline".into()))?;
        *index += 1;

        if !(63..=126).contains(&byte) {
            return Err(NavError::InvalidInput(format!(
                "invalid polyline character {:?} at {}",
                byte as char,
                *index - 1
            )));
        }
        if shift > 60 {
            return Err(NavError::InvalidInput("polyline value overflow".into()));
        }

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
    }

    // Zig-zag: lowest bit carries the sign
    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}
