//! `/api/lifecycle/*`: a point-in-time export of everything this process
//! knows about its own and its workers' lifecycle state, and a narrow
//! health check over just that subsystem.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/lifecycle/export", get(export))
        .route("/api/lifecycle/health", get(health))
}

#[derive(Serialize)]
struct LifecycleExport {
    readiness: crate::warmup::ReadinessStatus,
    workers: Vec<crate::workers::WorkerSummary>,
    total_worker_spawns: u64,
    total_worker_terminations: u64,
    entity_versions: Vec<crate::entity_versions::VersionedEntity>,
}

async fn export(State(state): State<AppState>) -> impl IntoResponse {
    Json(LifecycleExport {
        readiness: state.warmup.readiness(),
        workers: state.worker_pool.snapshot(),
        total_worker_spawns: state.worker_pool.total_spawns(),
        total_worker_terminations: state.worker_pool.total_terminations(),
        entity_versions: state.entity_versions.all(),
    })
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let readiness = state.warmup.readiness();
    Json(serde_json::json!({
        "status": if readiness.ready { "ok" } else { "degraded" },
        "worker_count": state.worker_pool.snapshot().len(),
    }))
}
