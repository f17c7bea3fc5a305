//! Single-slot snapshot hand-off between publisher and consumer.
//!
//! Holds at most one snapshot. Publishing into an occupied slot replaces
//! the old snapshot, so the consumer only ever observes the newest data
//! no matter how far it falls behind.

use std::sync::Mutex;

use crate::models::Snapshot;

#[derive(Debug, Default)]
pub struct SnapshotChannel {
    slot: Mutex<Option<Snapshot>>,
}

impl SnapshotChannel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `snapshot`, replacing any undrained one.
    ///
    /// Returns `true` when an older snapshot was displaced.
    pub fn publish(&self, snapshot: Snapshot) -> bool {
        self.lock().replace(snapshot).is_some()
    }

    /// Takes the pending snapshot, leaving the slot empty.
    pub fn drain(&self) -> Option<Snapshot> {
        self.lock().take()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Snapshot>> {
        // A poisoned slot still holds a coherent snapshot.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MarketWindow;
    use chrono::{NaiveDate, Utc};

    fn snapshot(symbols: &[&str]) -> Snapshot {
        let day = NaiveDate::from_ymd_opt(2024, 3, 18).unwrap();
        Snapshot::new(
            symbols.iter().map(|s| (*s).to_string()).collect(),
            MarketWindow {
                trading_day: day,
                previous_trading_day: day.pred_opt().unwrap(),
                is_open: true,
                next_reevaluation: Utc::now(),
            },
        )
    }

    #[test]
    fn empty_channel_drains_nothing() {
        let channel = SnapshotChannel::new();
        assert!(channel.is_empty());
        assert!(channel.drain().is_none());
    }

    #[test]
    fn publish_then_drain_roundtrips() {
        let channel = SnapshotChannel::new();
        assert!(!channel.publish(snapshot(&["AAPL"])));
        assert!(!channel.is_empty());
        let drained = channel.drain().unwrap();
        assert_eq!(drained.symbols, ["AAPL"]);
        assert!(channel.is_empty());
    }

    #[test]
    fn newer_snapshot_displaces_older() {
        let channel = SnapshotChannel::new();
        channel.publish(snapshot(&["AAPL"]));
        assert!(channel.publish(snapshot(&["TSLA"])));

        let drained = channel.drain().unwrap();
        assert_eq!(drained.symbols, ["TSLA"]);
        assert!(channel.drain().is_none());
    }

    #[test]
    fn shared_across_threads() {
        use std::sync::Arc;

        let channel = Arc::new(SnapshotChannel::new());
        let publisher = Arc::clone(&channel);
        std::thread::spawn(move || {
            publisher.publish(snapshot(&["AAPL"]));
        })
        .join()
        .unwrap();
        assert_eq!(channel.drain().unwrap().symbols, ["AAPL"]);
    }
}
