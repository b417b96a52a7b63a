//! Display-ready advisories for the next two maneuvers.

use serde::{Deserialize, Serialize};

use crate::maneuver::ManeuverKind;
use crate::route::RouteStep;

const FEET_PER_METER: f64 = 3.28084;
const METERS_PER_MILE: f64 = 1609.344;

/// Mile decimals for the imminent maneuver.
pub const PRIMARY_DECIMALS: usize = 1;
/// Mile decimals for the maneuver after that.
pub const SECONDARY_DECIMALS: usize = 2;

/// Glyph, label, formatted distance and road for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub maneuver: ManeuverKind,
    pub glyph: String,
    pub label: String,
    pub distance: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub road: Option<String>,
}

impl Advisory {
    fn for_step(step: &RouteStep, distance_m: f64, decimals: usize) -> Self {
        Self {
            maneuver: step.maneuver,
            glyph: step.maneuver.glyph().to_string(),
            label: step.maneuver.label().to_string(),
            distance: format_us_distance(distance_m, decimals),
            road: step.road_name(),
        }
    }
}

/// The primary (next) and secondary (following) advisories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryPair {
    pub primary: Advisory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<Advisory>,
}

/// Build the advisory pair for the step at `resolved_index`.
///
/// The primary distance is the live distance to the step end. The
/// secondary distance is the full length of the following step.
/// Returns None when `resolved_index` is out of range.
pub fn build_advisory(
    steps: &[RouteStep],
    resolved_index: usize,
    distance_to_step_end: f64,
) -> Option<AdvisoryPair> {
    let current = steps.get(resolved_index)?;
    let primary = Advisory::for_step(current, distance_to_step_end, PRIMARY_DECIMALS);
    let secondary = steps
        .get(resolved_index + 1)
        .map(|next| Advisory::for_step(next, next.distance_m, SECONDARY_DECIMALS));

    Some(AdvisoryPair { primary, secondary })
}

/// Format a distance in US units: whole feet under 1000 ft, otherwise
/// miles with `decimals` places.
pub fn format_us_distance(meters: f64, decimals: usize) -> String {
    let feet = meters * FEET_PER_METER;
    if feet < 1000.0 {
        format!("{} ft", feet.round() as i64)
    } else {
        format!("{:.*} mi", decimals, meters / METERS_PER_MILE)
    }
}
