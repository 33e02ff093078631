//! `/api/workers/*`: registry view, pool scaling, per-worker heap snapshots.
//! Every route here is dev-token- and local-origin-guarded per the security
//! primitives section; `snapshot/:id` is additionally rate-limited to one
//! request per 10 seconds per worker id.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use axum::Json;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::state::AppState;
use crate::workers::WorkerId;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/workers/registry", get(registry))
        .route("/api/workers/scale", post(scale))
        .route("/api/workers/snapshot/{id}", get(snapshot))
}

fn guard(state: &AppState, headers: &HeaderMap) -> Result<()> {
    super::require_dev_token(state, headers)?;
    super::require_local_origin(headers)
}

async fn registry(State(state): State<AppState>, headers: HeaderMap) -> Result<impl IntoResponse> {
    guard(&state, &headers)?;
    Ok(Json(state.worker_registry.view().await))
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum ScaleAction {
    Spawn,
    Terminate,
    List,
}

#[derive(Deserialize)]
struct ScaleRequest {
    action: ScaleAction,
    #[serde(default)]
    count: Option<usize>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<u64>,
}

async fn scale(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ScaleRequest>,
) -> Result<impl IntoResponse> {
    guard(&state, &headers)?;

    match body.action {
        ScaleAction::Spawn => {
            let count = body.count.unwrap_or(1);
            let kind = body.kind.as_deref().unwrap_or("api");
            state.worker_pool.spawn(count, kind).await?;
        }
        ScaleAction::Terminate => {
            let id = body
                .id
                .map(WorkerId)
                .ok_or_else(|| Error::validation("id", "missing", "worker id to terminate"))?;
            state.worker_pool.terminate(id).await?;
        }
        ScaleAction::List => {}
    }

    let view = state.worker_registry.view().await;
    Ok(Json(serde_json::json!({
        "registry": view.summary(),
        "totalWorkerSpawns": state.worker_pool.total_spawns(),
        "totalWorkerTerminations": state.worker_pool.total_terminations(),
    })))
}

fn parse_worker_id(raw: &str) -> Result<WorkerId> {
    raw.strip_prefix("worker-")
        .and_then(|n| n.parse::<u64>().ok())
        .map(WorkerId)
        .ok_or_else(|| Error::validation("id", raw, "`worker-<n>`"))
}

async fn snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    guard(&state, &headers)?;
    state.rate_limiters.worker_snapshot.check(&id)?;

    let worker_id = parse_worker_id(&id)?;
    let worker = state
        .worker_pool
        .get(worker_id)
        .ok_or_else(|| Error::not_found(format!("worker {id}")))?;

    let bytes = crate::workers::fetch_heap_snapshot(&worker).await.inspect_err(|e| {
        if matches!(e, Error::RequestTimeout) {
            state.metrics.track_timeout();
        }
    })?;
    Ok((StatusCode::OK, [(axum::http::header::CONTENT_TYPE, "application/json")], bytes))
}
