//! Application state: every subsystem a handler can reach, constructed once
//! at startup and cloned (cheaply, via internal `Arc`s) into each request.

use std::sync::Arc;

use dashmap::DashMap;

use crate::cache::SimpleCache;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::Collaborators;
use crate::config::Config;
use crate::csrf::CsrfStore;
use crate::entity_versions::EntityVersionRegistry;
use crate::event_loop::EventLoopMetrics;
use crate::metrics::MetricsState;
use crate::middleware::RateLimiters;
use crate::spline::Point;
use crate::static_files::StaticManifest;
use crate::warmup::WarmupOrchestrator;
use crate::websocket::{spline_live::SplineLiveState, Broadcaster, SubscriberCounts};
use crate::workers::{WorkerPool, WorkerRegistry};

/// Every subsystem a handler can reach, assembled once in
/// [`AppStateBuilder`] and cloned per request. Every field is internally
/// `Arc`-backed (or `Copy`), so cloning `AppState` is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clock: Arc<dyn Clock>,
    pub metrics: MetricsState,
    pub event_loop: EventLoopMetrics,
    pub warmup: Arc<WarmupOrchestrator>,
    pub csrf: Arc<CsrfStore>,
    pub rate_limiters: Arc<RateLimiters>,
    pub static_files: StaticManifest,
    pub worker_pool: Arc<WorkerPool>,
    pub worker_registry: Arc<WorkerRegistry>,
    pub gauge_cache: Arc<SimpleCache<serde_json::Value>>,
    pub ai_cache: Arc<SimpleCache<serde_json::Value>>,
    pub tension_cache: Arc<SimpleCache<serde_json::Value>>,
    pub entity_versions: Arc<EntityVersionRegistry>,
    pub collaborators: Collaborators,
    pub telemetry_broadcaster: Broadcaster,
    pub spline_live: SplineLiveState,
    pub subscribers: SubscriberCounts,
    /// Named spline presets stored by `POST /api/spline/preset/store`, an
    /// in-memory mirror of `<config.presets_dir>/<name>.yaml` on disk
    /// (loaded once at startup by `presets::load_all`, written through on
    /// every store). No eviction, the key space is operator-curated rather
    /// than user-supplied at scale.
    pub spline_presets: Arc<DashMap<String, Vec<Point>>>,
}

impl AppState {
    #[must_use]
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<Config>,
    clock: Option<Arc<dyn Clock>>,
    static_files: Option<StaticManifest>,
    collaborators: Option<Collaborators>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn static_files(mut self, manifest: StaticManifest) -> Self {
        self.static_files = Some(manifest);
        self
    }

    #[must_use]
    pub fn collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = Some(collaborators);
        self
    }

    #[must_use]
    pub fn build(self) -> AppState {
        let config = Arc::new(self.config.unwrap_or_default());
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let worker_pool = Arc::new(WorkerPool::new());
        let worker_registry = Arc::new(WorkerRegistry::new((*worker_pool).clone(), &config));
        let spline_presets = Arc::new(crate::presets::load_all(&config.presets_dir));
        let metrics = MetricsState::default();

        AppState {
            metrics: metrics.clone(),
            event_loop: EventLoopMetrics::default(),
            warmup: Arc::new(WarmupOrchestrator::default()),
            csrf: Arc::new(CsrfStore::new()),
            rate_limiters: Arc::new(RateLimiters::new(clock.clone(), metrics)),
            static_files: self.static_files.unwrap_or_default(),
            worker_pool,
            worker_registry,
            gauge_cache: Arc::new(SimpleCache::new(std::time::Duration::from_secs(60))),
            ai_cache: Arc::new(SimpleCache::new(std::time::Duration::from_secs(300))),
            tension_cache: Arc::new(SimpleCache::new(std::time::Duration::from_secs(60))),
            entity_versions: Arc::new(EntityVersionRegistry::with_defaults()),
            collaborators: self.collaborators.unwrap_or_default(),
            telemetry_broadcaster: Broadcaster::new(),
            spline_live: SplineLiveState::new(),
            subscribers: SubscriberCounts::new(),
            spline_presets,
            config,
            clock,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_usable_state() {
        let state = AppState::builder().config(Config::default()).build();
        assert_eq!(state.config.port, 3002);
        assert_eq!(state.worker_pool.snapshot().len(), 0);
    }

    #[test]
    fn default_caches_start_empty() {
        let state = AppState::builder().build();
        assert!(state.gauge_cache.is_empty());
        assert!(state.ai_cache.is_empty());
        assert!(state.tension_cache.is_empty());
    }
}
