//! Bespoke sliding-window rate limiter.
//!
//! Three named instances back the three documented buckets: the dashboard
//! (60/min per IP), generic per-route API limits (e.g. 100/min for spline
//! render), and the per-worker snapshot limiter (1 per 10s per worker id).
//! No external store: each key holds a log of the request timestamps that
//! currently fall inside `[now - window, now]` in a `DashMap`-guarded
//! `VecDeque`, so counting is exact (a fixed-window counter reset lets a
//! caller burst up to `2 * limit` across the boundary; a sliding log does
//! not).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dashmap::DashMap;

use crate::clock::Clock;
use crate::error::Error;
use crate::metrics::MetricsState;

/// Timestamps (epoch ms) of requests still inside the trailing window,
/// oldest first.
struct Window {
    hits: Mutex<VecDeque<i64>>,
}

/// One named limiter: `limit` requests per trailing `window`, keyed per
/// caller-chosen string.
pub struct RateLimiter {
    name: &'static str,
    limit: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    metrics: MetricsState,
    windows: DashMap<String, Window>,
}

pub struct RateLimitDecision {
    pub limit: u32,
    pub remaining: u32,
    pub reset_ms: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(name: &'static str, limit: u32, window: Duration, clock: Arc<dyn Clock>, metrics: MetricsState) -> Self {
        Self {
            name,
            limit,
            window,
            clock,
            metrics,
            windows: DashMap::new(),
        }
    }

    /// Returns `Ok` with the post-increment remaining count, or
    /// `Err(Error::RateLimited)` if this call is the one that exceeds the
    /// limit. Every call first evicts hits older than `window` from the
    /// key's log, then counts the survivors plus this call.
    pub fn check(&self, key: &str) -> Result<RateLimitDecision, Error> {
        let now_ms = self.clock.now_ms();
        let window_ms = self.window.as_millis() as i64;
        let cutoff_ms = now_ms - window_ms;

        let entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            hits: Mutex::new(VecDeque::new()),
        });
        let mut hits = entry.hits.lock().expect("rate limiter log lock poisoned");
        while hits.front().is_some_and(|&t| t <= cutoff_ms) {
            hits.pop_front();
        }

        let oldest_in_window = hits.front().copied();
        let count = hits.len() as u64 + 1;
        let reset_ms = oldest_in_window.map_or(now_ms + window_ms, |t| t + window_ms).max(now_ms) as u64;

        if count > u64::from(self.limit) {
            self.metrics.track_rate_limit_hit();
            return Err(Error::RateLimited {
                limiter: self.name.to_string(),
                retry_after_secs: ((reset_ms as i64 - now_ms).max(0) as u64).div_ceil(1000),
                limit: self.limit,
                remaining: 0,
                reset_ms,
            });
        }

        hits.push_back(now_ms);
        Ok(RateLimitDecision {
            limit: self.limit,
            remaining: self.limit.saturating_sub(count as u32),
            reset_ms,
        })
    }

    /// Drops keys whose entire log has fallen out of the window, called on
    /// the same sweep cadence as the TTL caches.
    pub fn sweep_expired(&self) {
        let now_ms = self.clock.now_ms();
        let window_ms = self.window.as_millis() as i64;
        let cutoff_ms = now_ms - window_ms;
        self.windows.retain(|_, w| {
            let hits = w.hits.lock().expect("rate limiter log lock poisoned");
            hits.back().is_some_and(|&t| t > cutoff_ms)
        });
    }
}

/// The three fixed named limiters the service runs.
pub struct RateLimiters {
    pub dashboard: RateLimiter,
    pub api: RateLimiter,
    pub worker_snapshot: RateLimiter,
}

impl RateLimiters {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, metrics: MetricsState) -> Self {
        Self {
            dashboard: RateLimiter::new("dashboard", 60, Duration::from_secs(60), clock.clone(), metrics.clone()),
            api: RateLimiter::new("api", 100, Duration::from_secs(60), clock.clone(), metrics.clone()),
            worker_snapshot: RateLimiter::new("worker-snapshot", 1, Duration::from_secs(10), clock, metrics),
        }
    }
}
