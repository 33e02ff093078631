//! Route assembly: the canonical path list, wired to `AppState`. One
//! `Router::new()` assembled from `.merge()`d sub-routers, with a
//! `.fallback` for the static-manifest/404 catch-all.

pub mod auth;
pub mod dashboard;
pub mod dev;
pub mod domain;
pub mod health;
pub mod lifecycle;
pub mod workers;
pub mod ws;

use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};

use crate::error::Error;
use crate::state::AppState;

const LOCAL_DEV_ORIGINS: [&str; 2] = ["http://localhost:3002", "http://127.0.0.1:3002"];

/// `/api/dev/workers/*` and `/api/workers/*` require this token in
/// `X-TES-Dev-Token`.
pub(crate) fn require_dev_token(state: &AppState, headers: &HeaderMap) -> Result<(), Error> {
    let provided = headers
        .get("x-tes-dev-token")
        .and_then(|v| v.to_str().ok());
    match provided {
        Some(token) if token == state.config.dev_token => Ok(()),
        _ => Err(Error::unauthorized("missing or invalid X-TES-Dev-Token")),
    }
}

/// The same endpoints reject any `Origin` that isn't absent or the
/// dashboard's own localhost:3002 origin.
pub(crate) fn require_local_origin(headers: &HeaderMap) -> Result<(), Error> {
    match headers.get(axum::http::header::ORIGIN).and_then(|v| v.to_str().ok()) {
        None => Ok(()),
        Some(origin) if LOCAL_DEV_ORIGINS.contains(&origin) => Ok(()),
        Some(origin) => Err(Error::forbidden(format!("origin `{origin}` is not permitted"))),
    }
}

/// Consumes the one-time CSRF token from `X-CSRF-Token`, required by
/// `POST /api/dev/bump-version`.
pub(crate) fn require_csrf(state: &AppState, headers: &HeaderMap) -> Result<(), Error> {
    let token = headers
        .get("x-csrf-token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::forbidden("missing X-CSRF-Token"))?;
    if state.csrf.verify_and_consume(token) {
        Ok(())
    } else {
        Err(Error::forbidden("invalid or already-used CSRF token"))
    }
}

/// Assembles every route this service serves into one `Router`, with the
/// static-manifest/404 fallback last.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(dashboard::router())
        .merge(health::router())
        .merge(auth::router())
        .merge(dev::router())
        .merge(workers::router())
        .merge(domain::router())
        .merge(lifecycle::router())
        .merge(ws::router())
        .fallback(fallback)
        .with_state(state)
}

async fn fallback(State(state): State<AppState>, uri: Uri, headers: HeaderMap) -> axum::response::Response {
    let path = uri.path();
    if let Some(file) = state.static_files.get(path) {
        return match file {
            crate::static_files::StaticFile::Immutable { bytes, etag, content_type } => {
                crate::static_files::serve_immutable(bytes, etag, content_type, &headers)
            }
            crate::static_files::StaticFile::Streamed { path, content_type } => {
                match crate::static_files::serve_streamed(path, content_type, &headers).await {
                    Ok(response) => response,
                    Err(err) => err.into_response(),
                }
            }
        };
    }

    if path.starts_with("/api/") {
        (
            axum::http::StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "not found", "status": 404 })),
        )
            .into_response()
    } else {
        (axum::http::StatusCode::NOT_FOUND, "not found").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_origin_accepts_known_dev_origins() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::ORIGIN, "http://localhost:3002".parse().unwrap());
        assert!(require_local_origin(&headers).is_ok());
    }

    #[test]
    fn local_origin_rejects_foreign_origin() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::ORIGIN, "http://evil.example:3002".parse().unwrap());
        assert!(require_local_origin(&headers).is_err());
    }

    #[test]
    fn local_origin_accepts_absent_origin() {
        assert!(require_local_origin(&HeaderMap::new()).is_ok());
    }

    #[test]
    fn dev_token_rejects_missing_header() {
        let state = AppState::builder().build();
        assert!(require_dev_token(&state, &HeaderMap::new()).is_err());
    }

    #[test]
    fn dev_token_accepts_matching_header() {
        let state = AppState::builder().build();
        let mut headers = HeaderMap::new();
        headers.insert("x-tes-dev-token", state.config.dev_token.parse().unwrap());
        assert!(require_dev_token(&state, &headers).is_ok());
    }
}
