//! Posted speed limit lookup.
//!
//! Best effort: nearest-roads first, snap-to-roads as fallback, and any
//! failure along the way only yields "no limit" plus a diagnostic code.

use std::fmt;

use async_trait::async_trait;
use log::{debug, warn};

use crate::error::Result;
use crate::geo::{probe_grid, LatLng};

/// The three Roads endpoints the lookup needs.
#[async_trait]
pub trait RoadsApi: Send + Sync {
    /// False when no key is configured; the lookup then short-circuits.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Road segment ids nearest to each point, in response order.
    async fn nearest_roads(&self, points: &[LatLng]) -> Result<Vec<String>>;

    /// Road segment ids along a snapped path, in response order.
    async fn snap_to_roads(&self, path: &[LatLng]) -> Result<Vec<String>>;

    /// Posted limits in mph for the given segment ids, in response order.
    async fn speed_limits(&self, place_ids: &[String]) -> Result<Vec<f64>>;
}

/// Which path produced (or failed to produce) a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    NoKey,
    NearestOk(usize),
    SnapOk(usize),
    SnapEmpty,
    SnapNoLimit,
    SnapError,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NoKey => write!(f, "no_key"),
            Diagnostic::NearestOk(n) => write!(f, "nearest_ok({n})"),
            Diagnostic::SnapOk(n) => write!(f, "snap_ok({n})"),
            Diagnostic::SnapEmpty => write!(f, "snap_empty"),
            Diagnostic::SnapNoLimit => write!(f, "snap_no_limit"),
            Diagnostic::SnapError => write!(f, "snap_err"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedLimitReading {
    pub limit_mph: Option<f64>,
    pub diagnostic: Diagnostic,
}

impl SpeedLimitReading {
    fn none(diagnostic: Diagnostic) -> Self {
        Self { limit_mph: None, diagnostic }
    }
}

/// Rate limit for lookups. The fetch time is recorded when a lookup is
/// allowed, before it runs.
#[derive(Debug, Clone)]
pub struct FetchGate {
    min_interval_ms: u64,
    last_fetch_at: Option<u64>,
}

impl FetchGate {
    pub fn new(min_interval_ms: u64) -> Self {
        Self { min_interval_ms, last_fetch_at: None }
    }

    /// Claim a lookup slot at `now_ms`.
    pub fn try_acquire(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_fetch_at {
            if now_ms.saturating_sub(last) < self.min_interval_ms {
                return false;
            }
        }
        self.last_fetch_at = Some(now_ms);
        true
    }

    pub fn last_fetch_at(&self) -> Option<u64> {
        self.last_fetch_at
    }

    pub fn reset(&mut self) {
        self.last_fetch_at = None;
    }
}

/// Run a lookup unless the gate says the previous one was too recent.
pub async fn maybe_fetch_speed_limit<A: RoadsApi + ?Sized>(
    api: &A,
    gate: &mut FetchGate,
    position: &LatLng,
    now_ms: u64,
    probe_offset_m: f64,
) -> Option<SpeedLimitReading> {
    if !gate.try_acquire(now_ms) {
        debug!("speed limit lookup skipped, last at {:?}", gate.last_fetch_at());
        return None;
    }
    Some(fetch_speed_limit(api, position, probe_offset_m).await)
}

/// Look up the posted limit around `position`.
pub async fn fetch_speed_limit<A: RoadsApi + ?Sized>(
    api: &A,
    position: &LatLng,
    probe_offset_m: f64,
) -> SpeedLimitReading {
    if !api.has_credentials() {
        return SpeedLimitReading::none(Diagnostic::NoKey);
    }

    let probes = probe_grid(position, probe_offset_m);

    match api.nearest_roads(&probes).await {
        Ok(ids) => {
            let ids = unique(ids);
            if !ids.is_empty() {
                match api.speed_limits(&ids).await {
                    Ok(limits) => {
                        if let Some(&limit) = limits.first() {
                            return SpeedLimitReading {
                                limit_mph: Some(limit),
                                diagnostic: Diagnostic::NearestOk(ids.len()),
                            };
                        }
                    }
                    Err(e) => warn!("speed limits after nearest roads failed: {e}"),
                }
            }
        }
        Err(e) => warn!("nearest roads failed: {e}"),
    }

    let ids = match api.snap_to_roads(&probes).await {
        Ok(ids) => unique(ids),
        Err(e) => {
            warn!("snap to roads failed: {e}");
            return SpeedLimitReading::none(Diagnostic::SnapError);
        }
    };
    if ids.is_empty() {
        return SpeedLimitReading::none(Diagnostic::SnapEmpty);
    }

    match api.speed_limits(&ids).await {
        Ok(limits) => match limits.first() {
            Some(&limit) => SpeedLimitReading {
                limit_mph: Some(limit),
                diagnostic: Diagnostic::SnapOk(ids.len()),
            },
            None => SpeedLimitReading::none(Diagnostic::SnapNoLimit),
        },
        Err(e) => {
            warn!("speed limits after snap to roads failed: {e}");
            SpeedLimitReading::none(Diagnostic::SnapError)
        }
    }
}

/// Drop empty and repeated ids, keeping first-seen order.
fn unique(ids: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !id.is_empty() && !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
