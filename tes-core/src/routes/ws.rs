//! Websocket upgrade endpoints. Each handler validates the upgrade request
//! (where one applies), then hands the accepted socket to the matching
//! `websocket::*::handle` loop.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::error::Result;
use crate::state::AppState;
use crate::websocket::{server_metrics, spline_live, telemetry, version_ws};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/workers/telemetry", get(workers_telemetry))
        .route("/ws/spline-live", get(spline_live_ws))
        .route("/api/dev/version-ws", get(version_ws_upgrade))
        .route("/ws/server-metrics/live", get(server_metrics_ws))
}

async fn workers_telemetry(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let broadcaster = state.telemetry_broadcaster.clone();
    let registry = (*state.worker_registry).clone();
    let metrics = state.metrics.clone();
    ws.protocols(telemetry::SUBPROTOCOLS)
        .on_upgrade(move |socket| telemetry::handle(socket, broadcaster, registry, metrics))
}

async fn spline_live_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let spline_state = state.spline_live.clone();
    let metrics = state.metrics.clone();
    ws.protocols(spline_live::SUBPROTOCOLS)
        .on_upgrade(move |socket| spline_live::handle(socket, spline_state, metrics))
}

#[derive(Deserialize)]
struct VersionWsQuery {
    token: Option<String>,
}

async fn version_ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<VersionWsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse> {
    let url_host = state.config.api_domain.clone().unwrap_or_else(|| state.config.hostname.clone());
    version_ws::authorize_upgrade(&state.csrf, &headers, query.token.as_deref(), &url_host)?;
    Ok(ws
        .protocols(version_ws::SUBPROTOCOLS)
        .on_upgrade(move |socket| version_ws::handle(socket)))
}

async fn server_metrics_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let metrics = state.metrics.clone();
    let event_loop = state.event_loop.clone();
    let subscribers = state.subscribers.clone();
    ws.on_upgrade(move |socket| server_metrics::handle(socket, metrics, event_loop, subscribers))
}
