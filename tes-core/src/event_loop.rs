//! Event-loop tick monitor.
//!
//! The original runtime is a single-threaded JavaScript event loop, where
//! tick duration is a direct proxy for responsiveness. This service has no
//! such loop, so a periodic self-probe task stands in for it: every tick
//! interval it measures how long it takes to yield back to the scheduler
//! once, which is this runtime's closest analogue to "how backed up is the
//! loop" under `tokio`'s cooperative scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A tick is "long" iff its duration is at least 16ms (60 FPS target).
const LONG_TICK_THRESHOLD: Duration = Duration::from_millis(16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Green,
    Yellow,
    Red,
}

#[derive(Default)]
struct Counters {
    tick_count: AtomicU64,
    long_tick_count: AtomicU64,
    max_tick_nanos: AtomicU64,
    /// Sum of all tick durations in nanoseconds, for the running average.
    total_tick_nanos: AtomicU64,
}

#[derive(Clone, Default)]
pub struct EventLoopMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EventLoopSnapshot {
    pub tick_count: u64,
    pub long_tick_count: u64,
    pub max_tick_duration_ms: f64,
    pub average_tick_duration_ms: f64,
    pub health: Health,
}

impl EventLoopMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self, duration: Duration) {
        self.inner.tick_count.fetch_add(1, Ordering::SeqCst);
        let nanos = duration.as_nanos() as u64;
        self.inner.total_tick_nanos.fetch_add(nanos, Ordering::SeqCst);
        if duration >= LONG_TICK_THRESHOLD {
            self.inner.long_tick_count.fetch_add(1, Ordering::SeqCst);
        }
        self.inner
            .max_tick_nanos
            .fetch_max(nanos, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> EventLoopSnapshot {
        let tick_count = self.inner.tick_count.load(Ordering::SeqCst);
        let long_tick_count = self.inner.long_tick_count.load(Ordering::SeqCst);
        let max_nanos = self.inner.max_tick_nanos.load(Ordering::SeqCst);
        let total_nanos = self.inner.total_tick_nanos.load(Ordering::SeqCst);
        let average_nanos = if tick_count == 0 { 0.0 } else { total_nanos as f64 / tick_count as f64 };

        let long_ratio = if tick_count == 0 { 0.0 } else { long_tick_count as f64 / tick_count as f64 };
        let health = if long_ratio >= 0.25 {
            Health::Red
        } else if long_ratio > 0.0 {
            Health::Yellow
        } else {
            Health::Green
        };

        EventLoopSnapshot {
            tick_count,
            long_tick_count,
            max_tick_duration_ms: max_nanos as f64 / 1_000_000.0,
            average_tick_duration_ms: average_nanos / 1_000_000.0,
            health,
        }
    }

    /// Spawns the background self-probe task: every `interval`, yields once
    /// to the scheduler and records how long that took as a tick. Runs until
    /// `cancellation` fires.
    pub fn spawn_probe(
        self,
        interval: Duration,
        cancellation: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancellation.cancelled() => break,
                    _ = ticker.tick() => {
                        let start = Instant::now();
                        tokio::task::yield_now().await;
                        self.record_tick(start.elapsed());
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_with_no_long_ticks() {
        let metrics = EventLoopMetrics::new();
        metrics.record_tick(Duration::from_millis(2));
        metrics.record_tick(Duration::from_millis(3));
        assert_eq!(metrics.snapshot().health, Health::Green);
    }

    #[test]
    fn yellow_when_some_ticks_are_long() {
        let metrics = EventLoopMetrics::new();
        metrics.record_tick(Duration::from_millis(2));
        metrics.record_tick(Duration::from_millis(2));
        metrics.record_tick(Duration::from_millis(2));
        metrics.record_tick(Duration::from_millis(20));
        assert_eq!(metrics.snapshot().health, Health::Yellow);
    }

    #[test]
    fn red_when_most_ticks_are_long() {
        let metrics = EventLoopMetrics::new();
        for _ in 0..4 {
            metrics.record_tick(Duration::from_millis(20));
        }
        assert_eq!(metrics.snapshot().health, Health::Red);
    }

    #[test]
    fn max_and_average_tracked_correctly() {
        let metrics = EventLoopMetrics::new();
        metrics.record_tick(Duration::from_millis(10));
        metrics.record_tick(Duration::from_millis(30));
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.max_tick_duration_ms, 30.0);
        assert_eq!(snapshot.average_tick_duration_ms, 20.0);
    }
}
