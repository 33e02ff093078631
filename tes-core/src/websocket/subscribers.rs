//! Subscriber-count tracking for the five fixed topics the dashboard and
//! `/api/dev/server-metrics` report on.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    Chat,
    StatusLive,
    Workers,
    VersionUpdates,
    SplineLive,
}

impl Topic {
    const ALL: [Topic; 5] = [
        Topic::Chat,
        Topic::StatusLive,
        Topic::Workers,
        Topic::VersionUpdates,
        Topic::SplineLive,
    ];

    fn index(self) -> usize {
        match self {
            Topic::Chat => 0,
            Topic::StatusLive => 1,
            Topic::Workers => 2,
            Topic::VersionUpdates => 3,
            Topic::SplineLive => 4,
        }
    }
}

#[derive(Clone, Default)]
pub struct SubscriberCounts {
    counts: Arc<[AtomicU64; 5]>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriberSnapshot {
    pub chat: u64,
    pub status_live: u64,
    pub workers: u64,
    pub version_updates: u64,
    pub spline_live: u64,
    pub total_subscribers: u64,
}

impl SubscriberCounts {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: Arc::new([
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ]),
        }
    }

    pub fn subscribe(&self, topic: Topic) {
        self.counts[topic.index()].fetch_add(1, Ordering::SeqCst);
    }

    pub fn unsubscribe(&self, topic: Topic) {
        self.counts[topic.index()]
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| Some(v.saturating_sub(1)))
            .ok();
    }

    #[must_use]
    pub fn count(&self, topic: Topic) -> u64 {
        self.counts[topic.index()].load(Ordering::SeqCst)
    }

    /// Reports subscriber counts for all five topics. Callers fall back to
    /// `pending_websockets` (the count of currently-open connections
    /// reported by `MetricsState`) when this snapshot's per-topic sum is
    /// zero but connections are known to be open.
    #[must_use]
    pub fn snapshot(&self) -> SubscriberSnapshot {
        let values: Vec<u64> = Topic::ALL.iter().map(|t| self.count(*t)).collect();
        SubscriberSnapshot {
            chat: values[0],
            status_live: values[1],
            workers: values[2],
            version_updates: values[3],
            spline_live: values[4],
            total_subscribers: values.iter().sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_and_unsubscribe_round_trip() {
        let counts = SubscriberCounts::new();
        counts.subscribe(Topic::SplineLive);
        counts.subscribe(Topic::SplineLive);
        assert_eq!(counts.count(Topic::SplineLive), 2);
        counts.unsubscribe(Topic::SplineLive);
        assert_eq!(counts.count(Topic::SplineLive), 1);
    }

    #[test]
    fn unsubscribe_below_zero_does_not_underflow() {
        let counts = SubscriberCounts::new();
        counts.unsubscribe(Topic::Chat);
        assert_eq!(counts.count(Topic::Chat), 0);
    }

    #[test]
    fn snapshot_sums_all_topics() {
        let counts = SubscriberCounts::new();
        counts.subscribe(Topic::Chat);
        counts.subscribe(Topic::Workers);
        let snapshot = counts.snapshot();
        assert_eq!(snapshot.total_subscribers, 2);
    }
}
