//! Routes and their turn-by-turn steps.
//!
//! A route is produced once per directions lookup and never mutated
//! afterwards; the tracker only moves an index through its steps.

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::instruction;
use crate::maneuver::ManeuverKind;

/// One maneuver segment of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Where this step's maneuver resolves.
    pub end_location: LatLng,
    /// Instruction text as delivered, possibly with HTML markup.
    pub instruction_markup: String,
    /// Length of the step in meters.
    pub distance_m: f64,
    #[serde(default)]
    pub maneuver: ManeuverKind,
}

impl RouteStep {
    pub fn road_name(&self) -> Option<String> {
        instruction::road_name(&self.instruction_markup)
    }
}

/// A drawn route: the decoded overview line plus its steps in order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub overview: Vec<LatLng>,
    pub steps: Vec<RouteStep>,
}

impl Route {
    pub fn new(overview: Vec<LatLng>, steps: Vec<RouteStep>) -> Self {
        Self { overview, steps }
    }

    /// Sum of all step lengths in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.steps.iter().map(|s| s.distance_m).sum()
    }

    /// The final step's end location.
    pub fn destination(&self) -> Option<LatLng> {
        self.steps.last().map(|s| s.end_location)
    }
}
