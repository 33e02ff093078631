//! `MetricsState`: request/WebSocket counters, and the `RequestGuard` RAII
//! wrapper around `trackRequestStart`/`trackRequestEnd` pairing.
//!
//! Grounded on the RAII idiom `tower`'s `Layer`/`Service` wrap pattern uses
//! throughout this corpus: rather than ask every handler to remember to
//! decrement a pending-request counter on every exit path (including panic
//! unwind), a guard value's `Drop` impl does it once, centrally.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide counters. Cheap to clone (`Arc` internally); shared via
/// `AppState`. Reset only on process restart, never by any handler.
#[derive(Clone, Default)]
pub struct MetricsState {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    pending_requests: AtomicU64,
    pending_websockets: AtomicU64,
    active_connections: AtomicU64,
    total_requests: AtomicU64,
    total_websocket_opens: AtomicU64,
    total_websocket_closes: AtomicU64,
    total_renders: AtomicU64,
    total_detections: AtomicU64,
    total_timeouts: AtomicU64,
    total_rate_limit_hits: AtomicU64,
}

/// Point-in-time snapshot, the shape `/api/dev/server-metrics` serializes.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSnapshot {
    pub pending_requests: u64,
    pub pending_websockets: u64,
    pub active_connections: u64,
    pub total_requests: u64,
    pub total_websocket_opens: u64,
    pub total_websocket_closes: u64,
    pub total_renders: u64,
    pub total_detections: u64,
    pub total_timeouts: u64,
    pub total_rate_limit_hits: u64,
    pub timestamp_ns: u128,
}

impl MetricsState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins tracking one in-flight request. The returned guard decrements
    /// `pending_requests` when dropped, regardless of how the handler
    /// returns.
    #[must_use]
    pub fn track_request_start(&self) -> RequestGuard {
        self.inner.pending_requests.fetch_add(1, Ordering::SeqCst);
        self.inner.total_requests.fetch_add(1, Ordering::SeqCst);
        RequestGuard { metrics: self.clone() }
    }

    pub fn track_websocket_open(&self) {
        self.inner.pending_websockets.fetch_add(1, Ordering::SeqCst);
        self.inner.active_connections.fetch_add(1, Ordering::SeqCst);
        self.inner.total_websocket_opens.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_websocket_close(&self) {
        self.inner.pending_websockets.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
            Some(v.saturating_sub(1))
        }).ok();
        self.inner.active_connections.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
            Some(v.saturating_sub(1))
        }).ok();
        self.inner.total_websocket_closes.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_render(&self) {
        self.inner.total_renders.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_detection(&self) {
        self.inner.total_detections.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_timeout(&self) {
        self.inner.total_timeouts.fetch_add(1, Ordering::SeqCst);
    }

    pub fn track_rate_limit_hit(&self) {
        self.inner.total_rate_limit_hits.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pending_requests: self.inner.pending_requests.load(Ordering::SeqCst),
            pending_websockets: self.inner.pending_websockets.load(Ordering::SeqCst),
            active_connections: self.inner.active_connections.load(Ordering::SeqCst),
            total_requests: self.inner.total_requests.load(Ordering::SeqCst),
            total_websocket_opens: self.inner.total_websocket_opens.load(Ordering::SeqCst),
            total_websocket_closes: self.inner.total_websocket_closes.load(Ordering::SeqCst),
            total_renders: self.inner.total_renders.load(Ordering::SeqCst),
            total_detections: self.inner.total_detections.load(Ordering::SeqCst),
            total_timeouts: self.inner.total_timeouts.load(Ordering::SeqCst),
            total_rate_limit_hits: self.inner.total_rate_limit_hits.load(Ordering::SeqCst),
            timestamp_ns: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
        }
    }

    fn end_request(&self) {
        self.inner.pending_requests.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| {
            Some(v.saturating_sub(1))
        }).ok();
    }
}

/// Dropping this guard is `trackRequestEnd`. Held for the lifetime of one
/// request's handling; never mem::forget'd by any caller in this crate.
pub struct RequestGuard {
    metrics: MetricsState,
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        self.metrics.end_request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_drop_decrements_pending_requests() {
        let metrics = MetricsState::new();
        {
            let _guard = metrics.track_request_start();
            assert_eq!(metrics.snapshot().pending_requests, 1);
        }
        assert_eq!(metrics.snapshot().pending_requests, 0);
    }

    #[test]
    fn totals_are_monotonic_across_many_requests() {
        let metrics = MetricsState::new();
        for _ in 0..5 {
            let _guard = metrics.track_request_start();
        }
        assert_eq!(metrics.snapshot().total_requests, 5);
        assert_eq!(metrics.snapshot().pending_requests, 0);
    }

    #[test]
    fn render_detection_timeout_and_rate_limit_counters_are_independent() {
        let metrics = MetricsState::new();
        metrics.track_render();
        metrics.track_render();
        metrics.track_detection();
        metrics.track_timeout();
        metrics.track_rate_limit_hit();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_renders, 2);
        assert_eq!(snapshot.total_detections, 1);
        assert_eq!(snapshot.total_timeouts, 1);
        assert_eq!(snapshot.total_rate_limit_hits, 1);
    }

    #[test]
    fn websocket_close_without_open_does_not_underflow() {
        let metrics = MetricsState::new();
        metrics.track_websocket_close();
        assert_eq!(metrics.snapshot().pending_websockets, 0);
    }

    #[test]
    fn websocket_open_close_pair_restores_active_connections() {
        let metrics = MetricsState::new();
        metrics.track_websocket_open();
        assert_eq!(metrics.snapshot().active_connections, 1);
        metrics.track_websocket_close();
        assert_eq!(metrics.snapshot().active_connections, 0);
        assert_eq!(metrics.snapshot().total_websocket_opens, 1);
        assert_eq!(metrics.snapshot().total_websocket_closes, 1);
    }
}
