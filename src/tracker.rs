//! Turn progression along a route.
//!
//! The tracker re-localizes the traveler against a small window of steps
//! around the current one on every fix, builds the advisory pair and
//! advances to the next step once the current step end is within the
//! arrival threshold. The step index never moves backwards for a route.

use log::{debug, info};
use serde::Serialize;

use crate::advisory::{build_advisory, AdvisoryPair};
use crate::config::NavTuning;
use crate::geo::{haversine, LatLng};
use crate::route::{Route, RouteStep};
use crate::speed_limit::{FetchGate, SpeedLimitReading};

/// Steps examined behind the prior index.
pub const WINDOW_BEHIND: usize = 2;
/// Steps examined ahead of the prior index.
pub const WINDOW_AHEAD: usize = 3;

/// Find the step whose end is nearest to `position`, looking only at
/// the window around `prior_index`.
///
/// Keeps `prior_index` unless another candidate is strictly closer.
/// Returns the chosen index and the distance to its end, or None for an
/// empty step list.
pub fn locate_current_step(
    position: &LatLng,
    steps: &[RouteStep],
    prior_index: usize,
) -> Option<(usize, f64)> {
    let last = steps.len().checked_sub(1)?;
    let prior = prior_index.min(last);
    let dist_to = |k: usize| haversine(position, &steps[k].end_location);

    let mut best = (prior, dist_to(prior));
    let lo = prior.saturating_sub(WINDOW_BEHIND);
    let hi = (prior + WINDOW_AHEAD).min(last);

    for k in lo..=hi {
        let d = dist_to(k);
        if d < best.1 {
            best = (k, d);
        }
    }

    Some(best)
}

/// Locate the current step without ever going back past
/// `current_index`.
///
/// The window may pick an earlier step on a noisy fix; the current step
/// is held instead, with the distance to its own end.
pub fn resolve_step(
    position: &LatLng,
    steps: &[RouteStep],
    current_index: usize,
) -> Option<(usize, f64)> {
    let (located, distance) = locate_current_step(position, steps, current_index)?;
    let held = current_index.min(steps.len() - 1);
    if located < held {
        Some((held, haversine(position, &steps[held].end_location)))
    } else {
        Some((located, distance))
    }
}

/// Outcome of checking a located step against the arrival threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Stay,
    /// The step end was reached; move to this index.
    To(usize),
    /// The final step end was reached.
    Arrived,
}

pub fn advance_if_arrived(
    resolved_index: usize,
    distance_to_step_end: f64,
    step_count: usize,
    threshold_m: f64,
) -> Advance {
    if distance_to_step_end > threshold_m {
        Advance::Stay
    } else if resolved_index + 1 < step_count {
        Advance::To(resolved_index + 1)
    } else {
        Advance::Arrived
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum NavPhase {
    NoRoute,
    Tracking { index: usize },
    Arrived,
}

/// Result of feeding one fix to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProgress {
    pub index: usize,
    pub distance_to_step_end_m: f64,
    pub advance: Advance,
    pub advisory: AdvisoryPair,
}

impl StepProgress {
    /// The step index to carry into the next fix.
    pub fn next_index(&self) -> usize {
        match self.advance {
            Advance::To(next) => next,
            Advance::Stay | Advance::Arrived => self.index,
        }
    }

    pub fn arrived(&self) -> bool {
        self.advance == Advance::Arrived
    }
}

/// Locate, build the advisory pair and decide advancement for one fix.
///
/// Stateless: the caller owns `current_index` and stores
/// `next_index()` for the next fix. Reaching the final step clears the
/// secondary advisory.
pub fn track_step(
    position: &LatLng,
    steps: &[RouteStep],
    current_index: usize,
    threshold_m: f64,
) -> Option<StepProgress> {
    let (index, distance) = resolve_step(position, steps, current_index)?;
    let mut advisory = build_advisory(steps, index, distance)?;
    let advance = advance_if_arrived(index, distance, steps.len(), threshold_m);
    if advance == Advance::Arrived {
        advisory.secondary = None;
    }

    Some(StepProgress {
        index,
        distance_to_step_end_m: distance,
        advance,
        advisory,
    })
}

/// Mutable per-route navigation state. Owned by a single session.
#[derive(Debug, Clone)]
pub struct TrackerState {
    steps: Vec<RouteStep>,
    current_index: usize,
    arrived: bool,
    speed_limit_mph: Option<f64>,
    speed_limit_gate: FetchGate,
    /// Bumped whenever the route is replaced or cleared.
    epoch: u64,
    arrival_threshold_m: f64,
}

impl TrackerState {
    pub fn new(tuning: &NavTuning) -> Self {
        Self {
            steps: Vec::new(),
            current_index: 0,
            arrived: false,
            speed_limit_mph: None,
            speed_limit_gate: FetchGate::new(tuning.speed_limit_min_interval_ms),
            epoch: 0,
            arrival_threshold_m: tuning.arrival_threshold_m,
        }
    }

    /// Replace the route. Resets the step index and the speed limit.
    pub fn set_route(&mut self, route: &Route) {
        self.reset();
        self.steps = route.steps.clone();
        info!("route set: {} steps, {:.0} m", self.steps.len(), route.total_distance_m());
    }

    pub fn clear(&mut self) {
        self.reset();
        info!("route cleared");
    }

    fn reset(&mut self) {
        self.steps.clear();
        self.current_index = 0;
        self.arrived = false;
        self.speed_limit_mph = None;
        self.speed_limit_gate.reset();
        self.epoch += 1;
    }

    pub fn phase(&self) -> NavPhase {
        if self.steps.is_empty() {
            NavPhase::NoRoute
        } else if self.arrived {
            NavPhase::Arrived
        } else {
            NavPhase::Tracking { index: self.current_index }
        }
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn speed_limit_mph(&self) -> Option<f64> {
        self.speed_limit_mph
    }

    /// Feed a position fix. Returns None when there is no route.
    pub fn on_position(&mut self, position: &LatLng) -> Option<StepProgress> {
        let mut progress =
            track_step(position, &self.steps, self.current_index, self.arrival_threshold_m)?;
        let (index, distance) = (progress.index, progress.distance_to_step_end_m);

        match progress.advance {
            Advance::To(next) => {
                info!("step {index} reached ({distance:.0} m), advancing to {next}")
            }
            Advance::Arrived if !self.arrived => info!("final step reached ({distance:.0} m)"),
            Advance::Arrived => {}
            Advance::Stay => debug!("step {index}, {distance:.0} m to go"),
        }

        self.current_index = progress.next_index();
        self.arrived |= progress.arrived();
        if self.arrived {
            progress.advisory.secondary = None;
        }

        Some(progress)
    }

    /// Claim a speed-limit lookup slot. Returns the epoch the result
    /// must be applied under, or None when rate limited.
    pub fn begin_speed_limit_fetch(&mut self, now_ms: u64) -> Option<u64> {
        self.speed_limit_gate.try_acquire(now_ms).then_some(self.epoch)
    }

    /// Apply a finished lookup. Results from an older route are dropped;
    /// a missing limit keeps the last known one.
    pub fn apply_speed_limit(&mut self, epoch: u64, reading: &SpeedLimitReading) -> bool {
        if epoch != self.epoch {
            debug!("dropping speed limit from epoch {epoch}, now {}", self.epoch);
            return false;
        }
        if let Some(limit) = reading.limit_mph {
            self.speed_limit_mph = Some(limit);
        }
        true
    }
}
