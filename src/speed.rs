//! Current speed versus posted limit.

use serde::{Deserialize, Serialize};

const MPH_PER_MPS: f64 = 2.23693629;

/// Convert a reported ground speed to mph. Missing or negative speeds
/// read as zero.
pub fn mps_to_mph(speed_mps: Option<f64>) -> f64 {
    match speed_mps {
        Some(v) if v.is_finite() => v.max(0.0) * MPH_PER_MPS,
        _ => 0.0,
    }
}

/// What the HUD shows in its speed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedReadout {
    pub mph: u32,
    pub limit_mph: Option<u32>,
    pub over_limit: bool,
}

impl SpeedReadout {
    /// `over_limit` is set when the rounded speed exceeds the rounded
    /// limit by more than `tolerance_mph`.
    pub fn new(speed_mps: Option<f64>, limit_mph: Option<f64>, tolerance_mph: u32) -> Self {
        let mph = mps_to_mph(speed_mps).round() as u32;
        let limit_mph = limit_mph
            .filter(|l| l.is_finite() && *l >= 0.0)
            .map(|l| l.round() as u32);
        let over_limit = limit_mph.is_some_and(|limit| is_over_limit(mph, limit, tolerance_mph));

        Self { mph, limit_mph, over_limit }
    }
}

pub fn is_over_limit(mph: u32, limit_mph: u32, tolerance_mph: u32) -> bool {
    mph > limit_mph.saturating_add(tolerance_mph)
}
