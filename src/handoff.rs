//! Snapshot hand-off from the route-owning side to HUD displays.
//!
//! A single-slot, last-write-wins channel. Readers only ever see the most
//! recent snapshot, and treat one older than the configured max age as
//! absent.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::advisory::Advisory;
use crate::error::Result;

/// What a HUD needs to render the turn cards and the limit sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HudSnapshot {
    pub primary: Option<Advisory>,
    pub secondary: Option<Advisory>,
    pub speed_limit_mph: Option<f64>,
    pub written_at_ms: u64,
}

impl HudSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.written_at_ms)
    }
}

/// Milliseconds since the Unix epoch, the clock snapshots are stamped with.
pub fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Create a connected publisher/subscriber pair.
pub fn channel(max_age_ms: u64) -> (SnapshotPublisher, SnapshotSubscriber) {
    let (tx, rx) = watch::channel(None);
    (
        SnapshotPublisher { tx },
        SnapshotSubscriber { rx, max_age_ms },
    )
}

#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Option<HudSnapshot>>,
}

impl SnapshotPublisher {
    /// Replace the current snapshot. Works with no subscribers attached.
    pub fn publish(&self, snapshot: HudSnapshot) {
        self.tx.send_replace(Some(snapshot));
    }

    pub fn subscribe(&self, max_age_ms: u64) -> SnapshotSubscriber {
        SnapshotSubscriber { rx: self.tx.subscribe(), max_age_ms }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotSubscriber {
    rx: watch::Receiver<Option<HudSnapshot>>,
    max_age_ms: u64,
}

impl SnapshotSubscriber {
    /// The latest snapshot if it is fresh at `now_ms`.
    pub fn latest(&self, now_ms: u64) -> Option<HudSnapshot> {
        self.rx
            .borrow()
            .as_ref()
            .filter(|s| s.age_ms(now_ms) <= self.max_age_ms)
            .cloned()
    }

    /// The latest snapshot regardless of age.
    pub fn peek(&self) -> Option<HudSnapshot> {
        self.rx.borrow().clone()
    }

    /// Wait for the next write. Returns None once the publisher is gone.
    pub async fn next(&mut self) -> Option<HudSnapshot> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maneuver::ManeuverKind;

    fn snapshot(written_at_ms: u64, limit: Option<f64>) -> HudSnapshot {
        HudSnapshot {
            primary: Some(Advisory {
                maneuver: ManeuverKind::TurnRight,
                glyph: "↱".into(),
                label: "Turn right".into(),
                distance: "820 ft".into(),
                road: Some("Main St".into()),
            }),
            secondary: None,
            speed_limit_mph: limit,
            written_at_ms,
        }
    }

    #[test]
    fn last_write_wins() {
        let (publisher, subscriber) = channel(5_000);
        assert!(subscriber.peek().is_none());

        publisher.publish(snapshot(1_000, Some(25.0)));
        publisher.publish(snapshot(2_000, Some(35.0)));

        let latest = subscriber.latest(2_500).unwrap();
        assert_eq!(latest.speed_limit_mph, Some(35.0));
        assert_eq!(latest.written_at_ms, 2_000);
    }

    #[test]
    fn stale_snapshot_is_absent() {
        let (publisher, subscriber) = channel(5_000);
        publisher.publish(snapshot(1_000, None));

        assert!(subscriber.latest(6_000).is_some());
        assert!(subscriber.latest(6_001).is_none());
        assert!(subscriber.peek().is_some());
    }

    #[test]
    fn json_blob() {
        let snap = snapshot(42, Some(30.0));
        let json = snap.to_json().unwrap();
        assert!(json.contains("\"turn-right\""));
        assert_eq!(HudSnapshot::from_json(&json).unwrap(), snap);
    }

    #[tokio::test]
    async fn next_sees_latest_write() {
        let (publisher, mut subscriber) = channel(5_000);
        publisher.publish(snapshot(1, None));
        publisher.publish(snapshot(2, None));

        let seen = subscriber.next().await.unwrap();
        assert_eq!(seen.written_at_ms, 2);

        drop(publisher);
        assert!(subscriber.next().await.is_none());
    }

    #[test]
    fn late_subscriber_sees_current_value() {
        let (publisher, _first) = channel(5_000);
        publisher.publish(snapshot(7, None));
        let late = publisher.subscribe(5_000);
        assert_eq!(late.peek().unwrap().written_at_ms, 7);
    }
}
