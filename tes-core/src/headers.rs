//! Canonical response headers and the JSON response helper.
//!
//! Cross-cutting headers are normally applied by layering `tower`/
//! `tower_http` services around the whole router, the way `server.rs`'s
//! `CorsLayer`/`TraceLayer`/`CompressionLayer` chain does. The API-metadata
//! headers required on *every* response (including error responses, which
//! bypass ordinary handler return paths) are narrower than a generic CORS
//! layer, so they are applied both by a small `axum::middleware::from_fn`
//! layer for the success path and directly by `Error::into_response` for
//! the failure path — one source of truth (`api_metadata_headers`) feeds
//! both.

use std::time::{Duration, Instant};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::Json;
use serde::Serialize;

use crate::clock::format_response_time_ms;
use crate::config::Config;

/// `{X-API-Domain, X-API-Scope, X-API-Version}` plus `Access-Control-Allow-Origin`.
/// Domain is read from `Config::api_domain` at call time by callers that have
/// a `Config`; handlers without direct config access (e.g. `Error`'s
/// `IntoResponse`) use the process-wide default recorded by
/// `init_api_metadata`.
static API_DOMAIN: std::sync::OnceLock<String> = std::sync::OnceLock::new();

const API_SCOPE: &str = "tes-control-plane";
const API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Called once at startup from the resolved `Config` so that header
/// construction sites that don't carry a `Config` reference (error
/// rendering) still emit the configured domain.
pub fn init_api_metadata(config: &Config) {
    let domain = config.api_domain.clone().unwrap_or_else(|| "localhost".to_string());
    let _ = API_DOMAIN.set(domain);
}

fn api_domain() -> &'static str {
    API_DOMAIN.get().map(String::as_str).unwrap_or("localhost")
}

/// The header set every response (except `304`/`204`) carries.
#[must_use]
pub fn api_metadata_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            HeaderName::from_static("x-api-domain"),
            HeaderValue::from_str(api_domain()).unwrap_or_else(|_| HeaderValue::from_static("localhost")),
        ),
        (
            HeaderName::from_static("x-api-scope"),
            HeaderValue::from_static(API_SCOPE),
        ),
        (
            HeaderName::from_static("x-api-version"),
            HeaderValue::from_static(API_VERSION),
        ),
        (
            HeaderName::from_static("access-control-allow-origin"),
            HeaderValue::from_static("*"),
        ),
    ]
}

/// Apply `api_metadata_headers`, and (if `start_time` is given) the
/// `X-Response-Time-Ms` timing header, to an existing header map.
pub fn apply_api_headers(headers: &mut HeaderMap, start_time: Option<Instant>) {
    for (name, value) in api_metadata_headers() {
        headers.insert(name, value);
    }
    if let Some(start) = start_time {
        let elapsed: Duration = start.elapsed();
        if let Ok(value) = HeaderValue::from_str(&format_response_time_ms(elapsed)) {
            headers.insert(HeaderName::from_static("x-response-time-ms"), value);
        }
    }
}

/// `axum::middleware::from_fn` layer that stamps every successful response
/// with the canonical header set and a timing header measured from when the
/// request entered the dispatcher.
pub async fn response_headers_layer(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let start = Instant::now();
    let mut response = next.run(request).await;
    let status = response.status();
    if status != axum::http::StatusCode::NOT_MODIFIED && status != axum::http::StatusCode::NO_CONTENT {
        apply_api_headers(response.headers_mut(), Some(start));
    }
    response
}

/// Cache-Control header for the `{durationSec, immutable, type}` cache
/// metadata attached to a route.
#[derive(Debug, Clone, Copy)]
pub struct CacheMetadata {
    pub duration_sec: u32,
    pub immutable: bool,
    pub public: bool,
}

impl CacheMetadata {
    #[must_use]
    pub fn header_value(&self) -> HeaderValue {
        let visibility = if self.public { "public" } else { "private" };
        let value = if self.immutable {
            format!("{visibility}, max-age={}, immutable", self.duration_sec)
        } else {
            format!("{visibility}, max-age={}", self.duration_sec)
        };
        HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("no-store"))
    }
}

/// Serializes `value` straight into the response body writer: `axum::Json`
/// already serializes directly into the outgoing `Bytes` buffer rather than
/// building a `String` first, so this is a thin, documented wrapper rather
/// than a new serialization path.
pub fn json_response<T: Serialize>(value: &T) -> Json<&T> {
    Json(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn response_headers_layer_skips_not_modified() {
        async fn handler() -> axum::http::StatusCode {
            axum::http::StatusCode::NOT_MODIFIED
        }
        let app = axum::Router::new()
            .route("/", axum::routing::get(handler))
            .layer(axum::middleware::from_fn(response_headers_layer));
        let response = tower::ServiceExt::oneshot(
            app,
            axum::http::Request::get("/").body(axum::body::Body::empty()).unwrap(),
        )
        .await
        .unwrap();
        assert!(response.headers().get("x-api-domain").is_none());
    }

    #[tokio::test]
    async fn response_headers_layer_stamps_ok_responses() {
        async fn handler() -> &'static str {
            "hi"
        }
        let app = axum::Router::new()
            .route("/", axum::routing::get(handler))
            .layer(axum::middleware::from_fn(response_headers_layer));
        let response = tower::ServiceExt::oneshot(
            app,
            axum::http::Request::get("/").body(axum::body::Body::empty()).unwrap(),
        )
        .await
        .unwrap();
        assert!(response.headers().get("x-api-domain").is_some());
    }

    #[test]
    fn cache_metadata_formats_immutable_public() {
        let meta = CacheMetadata {
            duration_sec: 3600,
            immutable: true,
            public: true,
        };
        assert_eq!(meta.header_value(), "public, max-age=3600, immutable");
    }

    #[test]
    fn cache_metadata_formats_mutable_private() {
        let meta = CacheMetadata {
            duration_sec: 60,
            immutable: false,
            public: false,
        };
        assert_eq!(meta.header_value(), "private, max-age=60");
    }
}
