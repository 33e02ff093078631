//! Static file serving from a fixed startup manifest: Range support and
//! `Last-Modified`/`If-Modified-Since` for streamed files, precomputed
//! ETags for immutable ones. There is no filesystem lookup outside the
//! manifest: an unlisted path is simply not a static file as far as this
//! module is concerned.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::etag;

/// One entry in the startup manifest.
#[derive(Clone)]
pub enum StaticFile {
    /// Loaded once at startup, served from memory with a precomputed ETag.
    /// Used for small, frequently-requested, rarely-changing assets.
    Immutable { bytes: Bytes, etag: String, content_type: &'static str },
    /// Opened per request; supports `Range` and `If-Modified-Since`. Used
    /// for larger assets where buffering the whole file is wasteful.
    Streamed { path: std::path::PathBuf, content_type: &'static str },
}

#[derive(Clone, Default)]
pub struct StaticManifest {
    files: Arc<HashMap<String, StaticFile>>,
}

impl StaticManifest {
    #[must_use]
    pub fn builder() -> StaticManifestBuilder {
        StaticManifestBuilder::default()
    }

    #[must_use]
    pub fn get(&self, route: &str) -> Option<&StaticFile> {
        self.files.get(route)
    }

    /// All registered routes, used by the endpoint metadata registry to
    /// merge static assets into `/api/dev/endpoints`.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

#[derive(Default)]
pub struct StaticManifestBuilder {
    files: HashMap<String, StaticFile>,
}

impl StaticManifestBuilder {
    #[must_use]
    pub fn immutable(mut self, route: impl Into<String>, content_type: &'static str, bytes: Vec<u8>) -> Self {
        let etag = etag::compute(&bytes);
        self.files.insert(
            route.into(),
            StaticFile::Immutable {
                bytes: Bytes::from(bytes),
                etag,
                content_type,
            },
        );
        self
    }

    #[must_use]
    pub fn streamed(mut self, route: impl Into<String>, content_type: &'static str, path: impl Into<std::path::PathBuf>) -> Self {
        self.files.insert(
            route.into(),
            StaticFile::Streamed {
                path: path.into(),
                content_type,
            },
        );
        self
    }

    #[must_use]
    pub fn build(self) -> StaticManifest {
        StaticManifest { files: Arc::new(self.files) }
    }
}

/// Serves an `Immutable` entry, honoring `If-None-Match`.
pub fn serve_immutable(bytes: &Bytes, etag_value: &str, content_type: &'static str, request_headers: &HeaderMap) -> Response {
    if etag::matches(request_headers, etag_value) {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    (
        StatusCode::OK,
        [
            (axum::http::header::CONTENT_TYPE, content_type),
            (axum::http::header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
        ],
        [(axum::http::header::ETAG, etag_value.to_string())],
        bytes.clone(),
    )
        .into_response()
}

/// Serves a `Streamed` entry from disk, honoring `Range` and
/// `If-Modified-Since`.
pub async fn serve_streamed(
    path: &std::path::Path,
    content_type: &'static str,
    request_headers: &HeaderMap,
) -> crate::error::Result<Response> {
    let metadata = tokio::fs::metadata(path).await?;
    let modified = metadata.modified().ok();
    let last_modified = modified.map(httpdate_from_systemtime);

    if let (Some(last_modified), Some(if_modified_since)) = (
        &last_modified,
        request_headers
            .get(axum::http::header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok()),
    ) {
        if last_modified == if_modified_since {
            return Ok(StatusCode::NOT_MODIFIED.into_response());
        }
    }

    let mut file_bytes = tokio::fs::read(path).await?;

    let range_header = request_headers
        .get(axum::http::header::RANGE)
        .and_then(|v| v.to_str().ok());

    if let Some(range) = range_header.and_then(parse_byte_range) {
        let (start, end) = range;
        let total = file_bytes.len();
        let end = end.min(total.saturating_sub(1));
        if start > end || start >= total {
            return Ok(StatusCode::RANGE_NOT_SATISFIABLE.into_response());
        }
        let slice = file_bytes[start..=end].to_vec();
        let content_range = format!("bytes {start}-{end}/{total}");
        let mut response = (
            StatusCode::PARTIAL_CONTENT,
            [(axum::http::header::CONTENT_TYPE, content_type)],
            [(axum::http::header::CONTENT_RANGE, content_range)],
            slice,
        )
            .into_response();
        if let Some(last_modified) = last_modified {
            if let Ok(value) = axum::http::HeaderValue::from_str(&last_modified) {
                response.headers_mut().insert(axum::http::header::LAST_MODIFIED, value);
            }
        }
        return Ok(response);
    }

    file_bytes.shrink_to_fit();
    let mut response = (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type)],
        file_bytes,
    )
        .into_response();
    if let Some(last_modified) = last_modified {
        if let Ok(value) = axum::http::HeaderValue::from_str(&last_modified) {
            response.headers_mut().insert(axum::http::header::LAST_MODIFIED, value);
        }
    }
    Ok(response)
}

fn httpdate_from_systemtime(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parses a single `bytes=START-END` range (multi-range requests are not
/// supported; the manifest only serves small-to-moderate assets).
fn parse_byte_range(header: &str) -> Option<(usize, usize)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end: usize = if end.is_empty() { usize::MAX } else { end.parse().ok()? };
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_computes_etag_for_immutable_entry() {
        let manifest = StaticManifest::builder()
            .immutable("/favicon.ico", "image/x-icon", vec![1, 2, 3])
            .build();
        match manifest.get("/favicon.ico") {
            Some(StaticFile::Immutable { etag, .. }) => assert!(!etag.is_empty()),
            _ => panic!("expected immutable entry"),
        }
    }

    #[test]
    fn unlisted_path_is_absent() {
        let manifest = StaticManifest::builder().build();
        assert!(manifest.get("/no-such-file").is_none());
    }

    #[test]
    fn parses_simple_byte_range() {
        assert_eq!(parse_byte_range("bytes=0-99"), Some((0, 99)));
    }

    #[test]
    fn parses_open_ended_byte_range() {
        assert_eq!(parse_byte_range("bytes=100-"), Some((100, usize::MAX)));
    }

    #[test]
    fn rejects_malformed_range() {
        assert_eq!(parse_byte_range("nonsense"), None);
    }
}
