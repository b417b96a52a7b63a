//! A navigation session: tracker, speed polling and HUD hand-off.
//!
//! All state is owned by one `NavSession` and mutated from one task.
//! Speed-limit lookups run as separate tasks so a slow Roads call never
//! holds up position handling; their results come back tagged with the
//! route epoch they were started under.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

use crate::advisory::AdvisoryPair;
use crate::config::NavTuning;
use crate::error::{NavError, Result};
use crate::geo::{LatLng, Position};
use crate::handoff::{wall_clock_ms, HudSnapshot, SnapshotPublisher};
use crate::route::Route;
use crate::speed::SpeedReadout;
use crate::speed_limit::{fetch_speed_limit, Diagnostic, RoadsApi, SpeedLimitReading};
use crate::tracker::{NavPhase, TrackerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationPermission {
    Granted,
    Denied,
}

/// Inputs the session reacts to, in arrival order.
#[derive(Debug, Clone)]
pub enum NavInput {
    Position(Position),
    Route(Route),
    ClearRoute,
}

/// What the route-owning screen renders after a fix.
#[derive(Debug, Clone, PartialEq)]
pub struct NavUpdate {
    pub phase: NavPhase,
    pub advisory: Option<AdvisoryPair>,
    pub speed: SpeedReadout,
}

/// A claimed speed-limit lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedLimitRequest {
    pub epoch: u64,
    pub position: LatLng,
}

pub struct NavSession {
    tracker: TrackerState,
    tuning: NavTuning,
    publisher: SnapshotPublisher,
    last_position: Option<Position>,
    last_advisory: Option<AdvisoryPair>,
    last_diagnostic: Option<Diagnostic>,
}

impl NavSession {
    /// Start a session. Refuses to start without location permission.
    pub fn start(
        permission: LocationPermission,
        tuning: NavTuning,
        publisher: SnapshotPublisher,
    ) -> Result<Self> {
        if permission == LocationPermission::Denied {
            return Err(NavError::PermissionDenied);
        }
        Ok(Self {
            tracker: TrackerState::new(&tuning),
            tuning,
            publisher,
            last_position: None,
            last_advisory: None,
            last_diagnostic: None,
        })
    }

    pub fn tracker(&self) -> &TrackerState {
        &self.tracker
    }

    pub fn tuning(&self) -> &NavTuning {
        &self.tuning
    }

    /// Diagnostic code of the last applied speed-limit lookup.
    pub fn last_diagnostic(&self) -> Option<Diagnostic> {
        self.last_diagnostic
    }

    pub fn handle(&mut self, input: NavInput, now_ms: u64) -> Option<NavUpdate> {
        match input {
            NavInput::Position(position) => Some(self.on_position(position, now_ms)),
            NavInput::Route(route) => {
                self.set_route(&route, now_ms);
                None
            }
            NavInput::ClearRoute => {
                self.clear_route(now_ms);
                None
            }
        }
    }

    pub fn set_route(&mut self, route: &Route, now_ms: u64) {
        self.tracker.set_route(route);
        self.last_advisory = None;
        match self.last_position {
            Some(position) => {
                self.on_position(position, now_ms);
            }
            None => self.publish(now_ms),
        }
    }

    pub fn clear_route(&mut self, now_ms: u64) {
        self.tracker.clear();
        self.last_advisory = None;
        self.publish(now_ms);
    }

    pub fn on_position(&mut self, position: Position, now_ms: u64) -> NavUpdate {
        self.last_position = Some(position);
        self.last_advisory = self
            .tracker
            .on_position(&position.coords)
            .map(|progress| progress.advisory);
        self.publish(now_ms);

        NavUpdate {
            phase: self.tracker.phase(),
            advisory: self.last_advisory.clone(),
            speed: self.speed_readout(),
        }
    }

    pub fn speed_readout(&self) -> SpeedReadout {
        SpeedReadout::new(
            self.last_position.and_then(|p| p.speed_mps),
            self.tracker.speed_limit_mph(),
            self.tuning.over_limit_tolerance_mph,
        )
    }

    /// Poll timer tick: republish the current snapshot so HUD readers
    /// keep seeing it while no fixes arrive, then try to claim a lookup.
    pub fn on_poll_tick(&mut self, now_ms: u64) -> Option<SpeedLimitRequest> {
        self.publish(now_ms);
        self.begin_speed_limit_fetch(now_ms)
    }

    /// Claim a lookup for the last known position, if one is known and
    /// the rate limit allows it.
    pub fn begin_speed_limit_fetch(&mut self, now_ms: u64) -> Option<SpeedLimitRequest> {
        let position = self.last_position?.coords;
        let epoch = self.tracker.begin_speed_limit_fetch(now_ms)?;
        Some(SpeedLimitRequest { epoch, position })
    }

    /// Apply a finished lookup. Returns false if the route changed
    /// since the lookup started.
    pub fn finish_speed_limit_fetch(
        &mut self,
        request: SpeedLimitRequest,
        reading: SpeedLimitReading,
        now_ms: u64,
    ) -> bool {
        debug!("speed limit lookup: {} {:?}", reading.diagnostic, reading.limit_mph);
        self.last_diagnostic = Some(reading.diagnostic);
        if !self.tracker.apply_speed_limit(request.epoch, &reading) {
            return false;
        }
        self.publish(now_ms);
        true
    }

    pub fn snapshot(&self, now_ms: u64) -> HudSnapshot {
        let (primary, secondary) = match &self.last_advisory {
            Some(pair) => (Some(pair.primary.clone()), pair.secondary.clone()),
            None => (None, None),
        };
        HudSnapshot {
            primary,
            secondary,
            speed_limit_mph: self.tracker.speed_limit_mph(),
            written_at_ms: now_ms,
        }
    }

    fn publish(&self, now_ms: u64) {
        self.publisher.publish(self.snapshot(now_ms));
    }
}

/// Drive a session from an input channel until the channel closes.
///
/// Speed limits are polled on the tuning's timer period. Returns the
/// session so callers can inspect the final state.
pub async fn run(
    mut session: NavSession,
    mut inputs: mpsc::Receiver<NavInput>,
    roads: Arc<dyn RoadsApi>,
) -> NavSession {
    let poll = Duration::from_millis(session.tuning.speed_limit_poll_ms.max(1));
    let probe_offset_m = session.tuning.probe_offset_m;
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let (done_tx, mut done_rx) =
        mpsc::unbounded_channel::<(SpeedLimitRequest, SpeedLimitReading)>();

    info!("navigation session running, speed limit poll every {poll:?}");

    loop {
        tokio::select! {
            input = inputs.recv() => match input {
                Some(input) => {
                    session.handle(input, wall_clock_ms());
                }
                None => break,
            },
            _ = ticker.tick() => {
                if let Some(request) = session.on_poll_tick(wall_clock_ms()) {
                    let roads = Arc::clone(&roads);
                    let done_tx = done_tx.clone();
                    tokio::spawn(async move {
                        let reading =
                            fetch_speed_limit(roads.as_ref(), &request.position, probe_offset_m)
                                .await;
                        let _ = done_tx.send((request, reading));
                    });
                }
            },
            Some((request, reading)) = done_rx.recv() => {
                session.finish_speed_limit_fetch(request, reading, wall_clock_ms());
            },
        }
    }

    info!("navigation session input closed");
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handoff::{channel, SnapshotSubscriber};
    use crate::maneuver::ManeuverKind;
    use crate::route::RouteStep;
    use crate::speed_limit::tests::FakeRoads;
    use std::sync::atomic::Ordering;

    fn route() -> Route {
        let steps = (1..=3)
            .map(|i| RouteStep {
                end_location: LatLng::new(37.0 + 0.01 * i as f64, 127.0),
                instruction_markup: format!("Turn <b>right</b> onto Road {i}"),
                distance_m: 1112.0,
                maneuver: ManeuverKind::TurnRight,
            })
            .collect();
        Route::new(vec![], steps)
    }

    fn session() -> (NavSession, SnapshotSubscriber) {
        let tuning = NavTuning::default();
        let (publisher, subscriber) = channel(tuning.hud_max_age_ms());
        let session = NavSession::start(LocationPermission::Granted, tuning, publisher).unwrap();
        (session, subscriber)
    }

    #[test]
    fn denied_permission_never_starts() {
        let (publisher, _sub) = channel(1_000);
        let result = NavSession::start(LocationPermission::Denied, NavTuning::default(), publisher);
        assert!(matches!(result, Err(NavError::PermissionDenied)));
    }

    #[test]
    fn position_updates_publish_snapshots() {
        let (mut s, sub) = session();
        s.set_route(&route(), 1_000);
        assert!(sub.peek().unwrap().primary.is_none());

        let update = s.on_position(Position::new(37.0, 127.0).with_speed(10.0), 2_000);
        assert_eq!(update.phase, NavPhase::Tracking { index: 0 });
        assert_eq!(update.speed.mph, 22);

        let snap = sub.latest(2_000).unwrap();
        assert_eq!(snap.primary.unwrap().road.as_deref(), Some("Road 1"));
        assert_eq!(snap.secondary.unwrap().road.as_deref(), Some("Road 2"));
    }

    #[test]
    fn route_set_after_fix_is_tracked_immediately() {
        let (mut s, sub) = session();
        s.on_position(Position::new(37.0, 127.0), 1_000);
        assert!(sub.peek().unwrap().primary.is_none());

        s.set_route(&route(), 1_500);
        assert!(sub.peek().unwrap().primary.is_some());
    }

    #[test]
    fn clearing_route_empties_snapshot() {
        let (mut s, sub) = session();
        s.set_route(&route(), 0);
        s.on_position(Position::new(37.0, 127.0), 100);
        s.clear_route(200);

        let snap = sub.peek().unwrap();
        assert!(snap.primary.is_none());
        assert!(snap.secondary.is_none());
        assert_eq!(s.tracker().phase(), NavPhase::NoRoute);
    }

    #[test]
    fn no_lookup_without_a_fix() {
        let (mut s, _sub) = session();
        assert!(s.begin_speed_limit_fetch(0).is_none());
    }

    #[test]
    fn lookup_result_for_replaced_route_is_ignored() {
        let (mut s, sub) = session();
        s.set_route(&route(), 0);
        s.on_position(Position::new(37.0, 127.0).with_speed(15.2), 0);

        let request = s.begin_speed_limit_fetch(0).unwrap();
        s.set_route(&route(), 1_000);

        let reading = SpeedLimitReading {
            limit_mph: Some(30.0),
            diagnostic: Diagnostic::NearestOk(1),
        };
        assert!(!s.finish_speed_limit_fetch(request, reading, 2_000));
        assert_eq!(sub.peek().unwrap().speed_limit_mph, None);
        assert_eq!(s.last_diagnostic(), Some(Diagnostic::NearestOk(1)));
    }

    #[test]
    fn applied_limit_drives_over_limit_flag() {
        let (mut s, sub) = session();
        s.set_route(&route(), 0);
        s.on_position(Position::new(37.0, 127.0).with_speed(15.2), 0);

        let request = s.begin_speed_limit_fetch(0).unwrap();
        let reading = SpeedLimitReading {
            limit_mph: Some(30.0),
            diagnostic: Diagnostic::SnapOk(2),
        };
        assert!(s.finish_speed_limit_fetch(request, reading, 10));

        assert_eq!(sub.peek().unwrap().speed_limit_mph, Some(30.0));
        let speed = s.speed_readout();
        assert_eq!(speed.limit_mph, Some(30));
        assert!(speed.over_limit);
    }

    #[test]
    fn stationary_session_keeps_hud_fresh() {
        let (mut s, sub) = session();
        let poll = s.tuning().speed_limit_poll_ms;
        s.set_route(&route(), 0);
        s.on_position(Position::new(37.0, 127.0), 0);

        let request = s.on_poll_tick(0).unwrap();
        let reading = SpeedLimitReading {
            limit_mph: Some(30.0),
            diagnostic: Diagnostic::NearestOk(1),
        };
        s.finish_speed_limit_fetch(request, reading, 0);

        // No further fixes: only the poll timer republishes
        for tick in 1..=3u64 {
            let last = (tick - 1) * poll;
            for t in [last + 4_000, last + 6_000, last + poll - 1, last + poll] {
                let snap = sub.latest(t);
                assert!(snap.is_some(), "HUD went blank at t={t}");
                assert_eq!(snap.unwrap().speed_limit_mph, Some(30.0));
            }
            s.on_poll_tick(tick * poll);
        }
        assert_eq!(s.tracker().phase(), NavPhase::Tracking { index: 0 });
        assert!(sub.latest(3 * poll + 9_999).unwrap().primary.is_some());
    }

    #[test]
    fn replayed_drive_reaches_destination() {
        let drive = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test" xmlns="http://www.topografix.com/GPX/1/1">
  <trk><trkseg>
    <trkpt lat="37.0000" lon="127.0"></trkpt>
    <trkpt lat="37.0098" lon="127.0"></trkpt>
    <trkpt lat="37.0150" lon="127.0"></trkpt>
    <trkpt lat="37.0199" lon="127.0"></trkpt>
    <trkpt lat="37.0250" lon="127.0"></trkpt>
    <trkpt lat="37.0299" lon="127.0"></trkpt>
  </trkseg></trk>
</gpx>"#;
        let positions = crate::gpx::read_track_positions(drive.as_bytes()).unwrap();

        let (mut s, sub) = session();
        s.set_route(&route(), 0);

        let mut indices = Vec::new();
        for (i, pos) in positions.into_iter().enumerate() {
            let update = s.on_position(pos, i as u64 * 1_000);
            if let NavPhase::Tracking { index } = update.phase {
                indices.push(index);
            }
        }

        assert!(indices.windows(2).all(|w| w[0] <= w[1]), "index went back: {indices:?}");
        assert_eq!(s.tracker().phase(), NavPhase::Arrived);
        assert!(sub.peek().unwrap().secondary.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_polls_speed_limit() {
        let (s, sub) = session();
        let roads = Arc::new(FakeRoads::new(Some(vec!["p1"]), None, Some(vec![45.0])));
        let (tx, rx) = mpsc::channel(16);

        tx.send(NavInput::Route(route())).await.unwrap();
        tx.send(NavInput::Position(Position::new(37.0, 127.0))).await.unwrap();

        let handle = tokio::spawn(run(s, rx, roads.clone()));
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        assert!(roads.nearest_calls.load(Ordering::SeqCst) >= 1);
        let snap = sub.peek().unwrap();
        assert_eq!(snap.speed_limit_mph, Some(45.0));
        assert!(snap.primary.is_some());

        drop(tx);
        let session = handle.await.unwrap();
        assert_eq!(session.tracker().speed_limit_mph(), Some(45.0));
        assert_eq!(session.last_diagnostic(), Some(Diagnostic::NearestOk(1)));
    }
}
