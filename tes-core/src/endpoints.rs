//! Declarative endpoint metadata registry backing `/api/dev/endpoints` and
//! `/api/dev/endpoints/check`.
//!
//! `ENDPOINT_TABLE` is the single source of truth; `get_all_endpoints()`
//! merges it with the small legacy list that predates the declarative table
//! and with the static-file manifest, deduplicating by `(path, method)`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::static_files::StaticManifest;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Dev,
    Worker,
    Spline,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_schema: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_schema: Option<&'static str>,
    pub service: Service,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<&'static str>,
    /// `true` for `/ws/*` and `/api/dev/version-ws` upgrade paths: the live
    /// sweep skips these rather than issuing an HTTP GET against them.
    #[serde(skip)]
    pub is_websocket: bool,
}

const fn http(
    method: &'static str,
    path: &'static str,
    description: &'static str,
    service: Service,
) -> EndpointInfo {
    EndpointInfo {
        method,
        path,
        description,
        query_schema: None,
        body_schema: None,
        service,
        cache: None,
        is_websocket: false,
    }
}

const fn ws(path: &'static str, description: &'static str, service: Service) -> EndpointInfo {
    EndpointInfo {
        method: "GET",
        path,
        description,
        query_schema: None,
        body_schema: None,
        service,
        cache: None,
        is_websocket: true,
    }
}

/// The declarative table. Order is preserved in responses so the dashboard
/// renders endpoints in a stable, human-curated order.
pub const ENDPOINT_TABLE: &[EndpointInfo] = &[
    http("GET", "/health", "Process liveness probe", Service::Dev),
    http("GET", "/ready", "Warmup-gated readiness probe", Service::Dev),
    http("GET", "/api/version", "Static build/version metadata", Service::Dev),
    http("GET", "/api/dev/endpoints", "Declarative endpoint metadata table", Service::Dev),
    http("GET", "/api/dev/endpoints/check", "Live sweep of every non-websocket endpoint", Service::Dev),
    http("GET", "/api/dev/metrics", "Process-wide request/websocket counters", Service::Dev),
    http("GET", "/api/dev/configs", "Sanitized startup configuration", Service::Dev),
    http("GET", "/api/dev/workers", "Worker pool snapshot", Service::Worker),
    http("GET", "/api/dev/status", "Aggregate process status", Service::Dev),
    http("GET", "/api/dev/status/legacy", "Aggregate process status, legacy shape", Service::Dev),
    http("GET", "/api/dev/event-loop", "Event-loop tick health", Service::Dev),
    http("GET", "/api/dev/colors", "Tension relation color legend", Service::Dev),
    http("GET", "/api/dev/versions", "Entity version registry", Service::Dev),
    http("POST", "/api/dev/bump-version", "CSRF-guarded version bump", Service::Dev),
    http("GET", "/api/dev/server-metrics", "Point-in-time server metrics", Service::Dev),
    http("GET", "/api/dev/tmux/status", "tmux session status", Service::Dev),
    http("POST", "/api/dev/tmux/start", "Start a tmux session", Service::Dev),
    http("POST", "/api/dev/tmux/stop", "Stop a tmux session", Service::Dev),
    http("GET", "/api/workers/registry", "Worker registry view", Service::Worker),
    http("POST", "/api/workers/scale", "Spawn or terminate workers", Service::Worker),
    http("GET", "/api/workers/snapshot/:id", "Heap snapshot for one worker", Service::Worker),
    http("GET", "/api/tension/map", "Edge tension mapping", Service::Spline),
    http("POST", "/api/tension/batch", "Batch edge tension mapping", Service::Spline),
    http("GET", "/api/tension/help", "Tension mapping usage help", Service::Spline),
    http("GET", "/api/tension/health", "Tension collaborator health", Service::Spline),
    http("GET", "/api/tension/socket-info", "Tension websocket connection info", Service::Spline),
    http("GET", "/api/gauge/womens-sports", "WNBATOR gauge", Service::Spline),
    http("POST", "/api/ai/maparse", "Curve detection over a price series", Service::Spline),
    http("GET", "/api/ai/models/status", "AI curve-detector warmup status", Service::Spline),
    http("GET", "/api/validate/threshold", "Threshold string validation", Service::Dev),
    http("POST", "/api/spline/render", "Render a spline from control points", Service::Spline),
    http("POST", "/api/spline/predict", "Extrapolate a spline", Service::Spline),
    http("POST", "/api/spline/preset/store", "Persist a spline preset", Service::Spline),
    http("GET", "/api/lifecycle/export", "Export process lifecycle snapshot", Service::Dev),
    http("GET", "/api/lifecycle/health", "Lifecycle subsystem health", Service::Dev),
    http("GET", "/api/auth/csrf-token", "Issue a one-time CSRF token", Service::Dev),
    ws("/ws/workers/telemetry", "Live worker telemetry stream", Service::Worker),
    ws("/ws/spline-live", "60 FPS spline broadcast", Service::Spline),
    ws("/api/dev/version-ws", "Privileged version-update stream", Service::Dev),
    ws("/ws/server-metrics/live", "Live server metrics stream", Service::Dev),
];

/// Entries that predate the declarative table and are kept for backward
/// compatibility; merged in and deduplicated by `(path, method)`.
const LEGACY_TABLE: &[EndpointInfo] = &[
    http("GET", "/", "Dashboard", Service::Dev),
    http("GET", "/tension-map", "Redirects to /tension", Service::Dev),
];

#[derive(Debug, Clone, Serialize)]
pub struct EndpointBuckets {
    pub dev: Vec<EndpointInfo>,
    pub worker: Vec<EndpointInfo>,
    pub spline: Vec<EndpointInfo>,
}

/// Merges the declarative table, the legacy list, and the static-file
/// manifest, deduplicating by `(path, method)` with the declarative table
/// winning ties.
#[must_use]
pub fn get_all_endpoints(static_manifest: &StaticManifest) -> Vec<EndpointInfo> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();

    for entry in ENDPOINT_TABLE.iter().chain(LEGACY_TABLE.iter()) {
        if seen.insert((entry.path, entry.method)) {
            merged.push(entry.clone());
        }
    }

    for path in static_manifest.paths() {
        let leaked_path: &'static str = Box::leak(path.clone().into_boxed_str());
        if seen.insert((leaked_path, "GET")) {
            merged.push(http(
                "GET",
                leaked_path,
                "Static asset",
                Service::Dev,
            ));
        }
    }

    merged
}

#[must_use]
pub fn bucket_endpoints(static_manifest: &StaticManifest) -> EndpointBuckets {
    let all = get_all_endpoints(static_manifest);
    let mut buckets = EndpointBuckets {
        dev: Vec::new(),
        worker: Vec::new(),
        spline: Vec::new(),
    };
    for entry in all {
        match entry.service {
            Service::Dev => buckets.dev.push(entry),
            Service::Worker => buckets.worker.push(entry),
            Service::Spline => buckets.spline.push(entry),
        }
    }
    buckets
}

/// One header's 8-dimensional metadata enrichment, serialized per the
/// documented `Key:Value~[SCOPE][domain][TYPE][PURPOSE][VERSION][TICKET][API][#REF:url][TIMESTAMP]`
/// shape.
#[derive(Debug, Clone, Serialize)]
pub struct HeaderMetadata {
    pub key: String,
    pub value: String,
    pub scope: &'static str,
    pub domain: String,
    pub header_type: &'static str,
    pub meta_purpose: &'static str,
    pub version: &'static str,
    pub ticket: &'static str,
    pub bun_api: &'static str,
    pub timestamp: i64,
}

impl HeaderMetadata {
    #[must_use]
    pub fn new(key: &str, value: &str, domain: String, now_ms: i64) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
            scope: "api",
            domain,
            header_type: classify_header_type(key),
            meta_purpose: classify_purpose(key),
            version: "v1",
            ticket: "none",
            bun_api: "fetch",
            timestamp: now_ms,
        }
    }

    #[must_use]
    pub fn serialized(&self, url: &str) -> String {
        format!(
            "{}:{}~[{}][{}][{}][{}][{}][{}][{}][#REF:{}][{}]",
            self.key,
            self.value,
            self.scope.to_uppercase(),
            self.domain,
            self.header_type,
            self.meta_purpose,
            self.version,
            self.ticket,
            self.bun_api,
            url,
            self.timestamp,
        )
    }
}

fn classify_header_type(key: &str) -> &'static str {
    let lower = key.to_ascii_lowercase();
    if lower.starts_with("x-ratelimit") {
        "rate-limit"
    } else if lower.starts_with("x-api") {
        "metadata"
    } else if lower == "etag" || lower == "cache-control" {
        "cache"
    } else if lower == "set-cookie" {
        "cookie"
    } else {
        "generic"
    }
}

fn classify_purpose(key: &str) -> &'static str {
    let lower = key.to_ascii_lowercase();
    if lower.contains("rate") {
        "throttling"
    } else if lower.contains("cache") || lower == "etag" {
        "caching"
    } else if lower.contains("api") {
        "identification"
    } else {
        "informational"
    }
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct EndpointCheckSummary {
    pub checked: usize,
    pub ok: usize,
    pub failed: usize,
    pub skipped: Vec<SkippedEndpoint>,
    pub cookie_setting_endpoints: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEndpoint {
    pub path: &'static str,
    pub reason: &'static str,
}

/// Substitutes example values for `:param` path segments so the live sweep
/// can issue a concrete request.
#[must_use]
pub fn substitute_example_params(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if let Some(param) = segment.strip_prefix(':') {
                example_value_for(param)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn example_value_for(param: &str) -> String {
    match param {
        "id" => "worker-0".to_string(),
        "endpoint" => "metrics".to_string(),
        _ => "example".to_string(),
    }
}

/// Default timeout for the live endpoint-check sweep.
pub const ENDPOINT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarative_table_has_no_internal_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for entry in ENDPOINT_TABLE {
            assert!(seen.insert((entry.path, entry.method)), "duplicate {} {}", entry.method, entry.path);
        }
    }

    #[test]
    fn merge_deduplicates_against_legacy_table() {
        let manifest = StaticManifest::builder().build();
        let merged = get_all_endpoints(&manifest);
        let mut seen = std::collections::HashSet::new();
        for entry in &merged {
            assert!(seen.insert((entry.path, entry.method)));
        }
    }

    #[test]
    fn buckets_partition_by_service() {
        let manifest = StaticManifest::builder().build();
        let buckets = bucket_endpoints(&manifest);
        assert!(buckets.dev.iter().all(|e| e.service == Service::Dev));
        assert!(buckets.worker.iter().all(|e| e.service == Service::Worker));
        assert!(buckets.spline.iter().all(|e| e.service == Service::Spline));
    }

    #[test]
    fn param_substitution_fills_known_segments() {
        assert_eq!(substitute_example_params("/api/workers/snapshot/:id"), "/api/workers/snapshot/worker-0");
    }

    #[test]
    fn header_metadata_serializes_in_documented_shape() {
        let meta = HeaderMetadata::new("X-RateLimit-Remaining", "0", "tes.example".to_string(), 1000);
        let serialized = meta.serialized("/api/dev/workers");
        assert!(serialized.starts_with("X-RateLimit-Remaining:0~["));
        assert!(serialized.contains("#REF:/api/dev/workers"));
    }

    #[test]
    fn websocket_endpoints_are_flagged() {
        let ws_entry = ENDPOINT_TABLE.iter().find(|e| e.path == "/ws/spline-live").unwrap();
        assert!(ws_entry.is_websocket);
    }
}
