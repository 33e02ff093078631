//! Clock and high-resolution timing primitives.
//!
//! Injecting a `Clock` rather than sprinkling `Instant::now()`/
//! `SystemTime::now()` through handlers lets tests swap in a virtual clock
//! to assert timing headers and rate-limit windows deterministically.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of wall-clock and monotonic time. The production implementation
/// delegates to `std`; tests can implement this trait with a controllable
/// clock.
pub trait Clock: Send + Sync + 'static {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
    /// A monotonic instant, for measuring elapsed durations.
    fn monotonic_now(&self) -> Instant;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }

    fn monotonic_now(&self) -> Instant {
        Instant::now()
    }
}

/// A virtual clock for deterministic tests: `now_ms` is an atomic counter
/// that only advances when explicitly told to.
#[derive(Debug)]
pub struct VirtualClock {
    epoch_ms: AtomicI64,
    base: Instant,
}

impl VirtualClock {
    #[must_use]
    pub fn new(start_ms: i64) -> Self {
        Self {
            epoch_ms: AtomicI64::new(start_ms),
            base: Instant::now(),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.epoch_ms
            .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms.load(Ordering::SeqCst)
    }

    fn monotonic_now(&self) -> Instant {
        self.base
    }
}

/// Formats an elapsed duration as milliseconds with two decimal places, the
/// format `X-Response-Time-Ms` requires.
#[must_use]
pub fn format_response_time_ms(elapsed: Duration) -> String {
    format!("{:.2}", elapsed.as_secs_f64() * 1000.0)
}
