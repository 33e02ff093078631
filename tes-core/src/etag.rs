//! ETag generation and `If-None-Match` revalidation.

use axum::http::{HeaderMap, HeaderValue};

/// A strong ETag: a stable `blake3` hash over the response bytes, rather
/// than a weak/last-modified tag.
#[must_use]
pub fn compute(bytes: &[u8]) -> String {
    format!("\"{}\"", blake3::hash(bytes).to_hex())
}

/// `true` if the request's `If-None-Match` header matches `etag` exactly,
/// meaning the handler should answer `304 Not Modified` instead of resending
/// the body. Per-spec this is an exact match, not the weak-comparison
/// algorithm HTTP/1.1 defines for general caches.
#[must_use]
pub fn matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get(axum::http::header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|candidate| candidate == etag)
}

#[must_use]
pub fn header_value(etag: &str) -> HeaderValue {
    HeaderValue::from_str(etag).unwrap_or_else(|_| HeaderValue::from_static("\"invalid\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_bytes_produce_same_etag() {
        assert_eq!(compute(b"hello"), compute(b"hello"));
    }

    #[test]
    fn different_bytes_produce_different_etag() {
        assert_ne!(compute(b"hello"), compute(b"world"));
    }

    #[test]
    fn matching_if_none_match_header_is_detected() {
        let etag = compute(b"payload");
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::IF_NONE_MATCH, header_value(&etag));
        assert!(matches(&headers, &etag));
    }

    #[test]
    fn mismatched_if_none_match_header_is_rejected() {
        let etag = compute(b"payload");
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::IF_NONE_MATCH, header_value("\"stale\""));
        assert!(!matches(&headers, &etag));
    }
}
