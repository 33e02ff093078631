//! `/`, `/favicon.ico`, `/tension-map`: the dashboard's own fixed entry
//! points, as opposed to the generic static-manifest fallback in
//! `routes::fallback` that serves everything else the manifest knows about.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::error::Result;
use crate::middleware::dashboard_headers;
use crate::state::AppState;

const FALLBACK_DASHBOARD_HTML: &str = concat!(
    "<!doctype html><html><head><title>tes-core</title></head>",
    "<body><h1>tes-core control plane</h1>",
    "<p>No dashboard bundle registered in the static manifest.</p></body></html>",
);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard))
        .route("/favicon.ico", get(favicon))
        .route("/tension-map", get(tension_map_redirect))
}

async fn dashboard(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response> {
    state.rate_limiters.dashboard.check(&addr.ip().to_string())?;

    let mut response = match state.static_files.get("/") {
        Some(crate::static_files::StaticFile::Immutable { bytes, etag, content_type }) => {
            crate::static_files::serve_immutable(bytes, etag, content_type, &headers)
        }
        _ => Html(FALLBACK_DASHBOARD_HTML).into_response(),
    };
    for (name, value) in dashboard_headers(state.config.is_production()) {
        response.headers_mut().insert(name, value);
    }
    Ok(response)
}

async fn favicon(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.static_files.get("/favicon.ico") {
        Some(crate::static_files::StaticFile::Immutable { bytes, etag, content_type }) => {
            crate::static_files::serve_immutable(bytes, etag, content_type, &headers)
        }
        _ => axum::http::StatusCode::NO_CONTENT.into_response(),
    }
}

async fn tension_map_redirect() -> Redirect {
    Redirect::temporary("/tension")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn favicon_without_static_manifest_is_no_content() {
        let state = AppState::builder().build();
        let app = router().with_state(state);
        let response = app
            .oneshot(Request::get("/favicon.ico").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn tension_map_redirects_to_tension() {
        let state = AppState::builder().build();
        let app = router().with_state(state);
        let response = app
            .oneshot(Request::get("/tension-map").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers().get("location").unwrap(), "/tension");
    }
}
