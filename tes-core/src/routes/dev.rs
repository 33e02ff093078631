//! `/api/dev/*`: developer-facing introspection and control endpoints.
//!
//! `workers` is the one route here guarded the same way as `/api/workers/*`
//! (dev token + local origin); everything else under `/api/dev` is
//! read-only diagnostics or CSRF-guarded mutation, not token-guarded.

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::endpoints::{self, HeaderMetadata, SkippedEndpoint};
use crate::entity_versions::BumpKind;
use crate::error::{Error, Result};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/dev/endpoints", get(list_endpoints))
        .route("/api/dev/endpoints/check", get(check_endpoints))
        .route("/api/dev/metrics", get(metrics))
        .route("/api/dev/configs", get(configs))
        .route("/api/dev/workers", get(workers_snapshot))
        .route("/api/dev/status", get(status))
        .route("/api/dev/status/legacy", get(status_legacy))
        .route("/api/dev/event-loop", get(event_loop))
        .route("/api/dev/colors", get(colors))
        .route("/api/dev/versions", get(versions))
        .route("/api/dev/bump-version", post(bump_version))
        .route("/api/dev/server-metrics", get(server_metrics))
        .route("/api/dev/tmux/status", get(tmux_status))
        .route("/api/dev/tmux/start", post(tmux_start))
        .route("/api/dev/tmux/stop", post(tmux_stop))
        .route("/api/dev/{endpoint}", get(unknown_dev_endpoint))
}

async fn list_endpoints(State(state): State<AppState>) -> impl IntoResponse {
    Json(endpoints::bucket_endpoints(&state.static_files))
}

async fn check_endpoints(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let client = reqwest::Client::builder()
        .timeout(endpoints::ENDPOINT_CHECK_TIMEOUT)
        .build()
        .map_err(|e| Error::internal(e.to_string()))?;

    let base = format!("http://127.0.0.1:{}", state.config.port);
    let mut summary = endpoints::EndpointCheckSummary::default();

    for entry in endpoints::get_all_endpoints(&state.static_files) {
        if entry.is_websocket {
            summary.skipped.push(SkippedEndpoint {
                path: entry.path,
                reason: "websocket upgrade endpoint, not probed over plain HTTP",
            });
            continue;
        }
        if entry.method != "GET" {
            summary.skipped.push(SkippedEndpoint {
                path: entry.path,
                reason: "non-GET method not probed",
            });
            continue;
        }

        summary.checked += 1;
        let url = format!("{base}{}", endpoints::substitute_example_params(entry.path));
        match client.get(&url).send().await {
            Ok(response) => {
                if response.status().is_server_error() {
                    summary.failed += 1;
                } else {
                    summary.ok += 1;
                }
                if response.headers().contains_key(axum::http::header::SET_COOKIE) {
                    summary.cookie_setting_endpoints.push(entry.path);
                }
                let now_ms = state.clock.now_ms();
                for (name, value) in response.headers() {
                    if let Ok(value_str) = value.to_str() {
                        let meta = HeaderMetadata::new(name.as_str(), value_str, state.config.api_domain.clone().unwrap_or_else(|| "localhost".to_string()), now_ms);
                        tracing::debug!(header = %meta.serialized(&url), "endpoint check header");
                    }
                }
            }
            Err(_) => summary.failed += 1,
        }
    }

    Ok(Json(summary))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

#[derive(Serialize)]
struct SanitizedConfig {
    hostname: String,
    port: u16,
    idle_timeout_secs: u64,
    environment: String,
    shadow_ws_port: u16,
    worker_api_port: u16,
    spline_api_port: u16,
    log_requests: bool,
    primary_region: Option<String>,
    api_domain: Option<String>,
    initial_worker_count: usize,
}

async fn configs(State(state): State<AppState>) -> impl IntoResponse {
    Json(SanitizedConfig {
        hostname: state.config.hostname.clone(),
        port: state.config.port,
        idle_timeout_secs: state.config.idle_timeout_secs,
        environment: state.config.environment.clone(),
        shadow_ws_port: state.config.shadow_ws_port,
        worker_api_port: state.config.worker_api_port,
        spline_api_port: state.config.spline_api_port,
        log_requests: state.config.log_requests,
        primary_region: state.config.primary_region.clone(),
        api_domain: state.config.api_domain.clone(),
        initial_worker_count: state.config.initial_worker_count,
    })
}

async fn workers_snapshot(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    super::require_dev_token(&state, &headers)?;
    super::require_local_origin(&headers)?;
    Ok(Json(state.worker_pool.snapshot()))
}

#[derive(Serialize)]
struct StatusResponse {
    workers: Vec<crate::workers::WorkerSummary>,
    metrics: crate::metrics::MetricsSnapshot,
    event_loop: crate::event_loop::EventLoopSnapshot,
    readiness: crate::warmup::ReadinessStatus,
    subscribers: crate::websocket::subscribers::SubscriberSnapshot,
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        workers: state.worker_pool.snapshot(),
        metrics: state.metrics.snapshot(),
        event_loop: state.event_loop.snapshot(),
        readiness: state.warmup.readiness(),
        subscribers: state.subscribers.snapshot(),
    })
}

async fn status_legacy(State(state): State<AppState>) -> impl IntoResponse {
    let metrics = state.metrics.snapshot();
    let readiness = state.warmup.readiness();
    Json(serde_json::json!({
        "pendingRequests": metrics.pending_requests,
        "totalRequests": metrics.total_requests,
        "pendingWebsockets": metrics.pending_websockets,
        "ready": readiness.ready,
        "workerCount": state.worker_pool.snapshot().len(),
    }))
}

async fn event_loop(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.event_loop.snapshot())
}

async fn colors(State(state): State<AppState>) -> impl IntoResponse {
    let buckets = [
        ("temperate", 0.1_f64),
        ("moderate", 0.35),
        ("intense", 0.6),
        ("extreme", 0.9),
    ];
    let legend: Vec<_> = buckets
        .into_iter()
        .map(|(label, magnitude)| {
            let relation = state.collaborators.tension.map_edge_relation(magnitude, magnitude, magnitude);
            serde_json::json!({ "label": label, "relation": relation })
        })
        .collect();
    Json(legend)
}

#[derive(Serialize)]
struct VersionsResponse {
    entities: Vec<crate::entity_versions::VersionedEntity>,
    component_versions: HashMap<String, String>,
    endpoints_by_version: HashMap<String, Vec<String>>,
}

async fn versions(State(state): State<AppState>) -> impl IntoResponse {
    let entities = state.entity_versions.all();
    let component_versions = entities
        .iter()
        .map(|e| (e.id.clone(), e.current_version.clone()))
        .collect();
    let endpoints_by_version = entities
        .iter()
        .map(|e| (e.id.clone(), e.files.clone()))
        .collect();
    Json(VersionsResponse { entities, component_versions, endpoints_by_version })
}

#[derive(Deserialize)]
struct BumpVersionRequest {
    #[serde(rename = "type")]
    kind: BumpKind,
    entity: Option<String>,
}

async fn bump_version(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BumpVersionRequest>,
) -> Result<impl IntoResponse> {
    super::require_csrf(&state, &headers)?;

    let result = state.entity_versions.bump(body.kind, body.entity.as_deref())?;
    let (old_version, new_version) = match body.entity.as_deref() {
        Some(id) => result
            .affected
            .iter()
            .find(|outcome| outcome.entity_id == id)
            .map(|outcome| (outcome.old_version.clone(), outcome.new_version.clone()))
            .unwrap_or_default(),
        None => result
            .affected
            .first()
            .map(|outcome| (outcome.old_version.clone(), outcome.new_version.clone()))
            .unwrap_or_default(),
    };

    Ok(Json(serde_json::json!({
        "oldVersion": old_version,
        "newVersion": new_version,
        "affected": result.affected,
    })))
}

#[derive(Serialize)]
struct ServerMetricsResponse {
    timestamp_ns: u128,
    http: HttpMetrics,
    websockets: WebsocketMetrics,
    event_loop: crate::event_loop::EventLoopSnapshot,
}

#[derive(Serialize)]
struct HttpMetrics {
    pending_requests: u64,
    total_requests: u64,
}

#[derive(Serialize)]
struct WebsocketMetrics {
    pending: u64,
    subscribers: crate::websocket::subscribers::SubscriberSnapshot,
    total_subscribers: u64,
}

async fn server_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.snapshot();
    let subscribers = state.subscribers.snapshot();
    Json(ServerMetricsResponse {
        timestamp_ns: snapshot.timestamp_ns,
        http: HttpMetrics {
            pending_requests: snapshot.pending_requests,
            total_requests: snapshot.total_requests,
        },
        websockets: WebsocketMetrics {
            pending: snapshot.pending_websockets,
            total_subscribers: subscribers.total_subscribers,
            subscribers,
        },
        event_loop: state.event_loop.snapshot(),
    })
}

async fn tmux_status(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.collaborators.tmux.status().await?))
}

#[derive(Deserialize)]
struct TmuxSessionRequest {
    session: String,
}

async fn tmux_start(State(state): State<AppState>, Json(body): Json<TmuxSessionRequest>) -> Result<impl IntoResponse> {
    state.collaborators.tmux.start(&body.session).await?;
    Ok(Json(serde_json::json!({ "started": body.session })))
}

async fn tmux_stop(State(state): State<AppState>, Json(body): Json<TmuxSessionRequest>) -> Result<impl IntoResponse> {
    state.collaborators.tmux.stop(&body.session).await?;
    Ok(Json(serde_json::json!({ "stopped": body.session })))
}

async fn unknown_dev_endpoint(Path(endpoint): Path<String>) -> Error {
    Error::not_found(format!(
        "unknown dev endpoint `{endpoint}`; see /api/dev/endpoints for the full list"
    ))
}

