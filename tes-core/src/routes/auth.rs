//! `/api/auth/csrf-token`: issues the one-time token privileged WebSocket
//! upgrades and `POST /api/dev/bump-version` require.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/auth/csrf-token", get(issue_token))
}

async fn issue_token(State(state): State<AppState>) -> impl IntoResponse {
    let token = state.csrf.issue();
    Json(serde_json::json!({ "token": token }))
}
