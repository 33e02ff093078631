//! `dashboardHeaders(isProduction)`: security headers applied to the
//! dashboard and other HTML-rendering endpoints.

use axum::http::{HeaderName, HeaderValue};

/// The fixed CSP/X-Frame-Options/etc. header set for HTML responses.
/// `is_production` tightens the CSP to disallow inline scripts; development
/// mode keeps `'unsafe-inline'` so the dashboard's hot-reload script tag
/// still works.
#[must_use]
pub fn dashboard_headers(is_production: bool) -> Vec<(HeaderName, HeaderValue)> {
    let csp = if is_production {
        "default-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:"
    } else {
        "default-src 'self'; script-src 'self' 'unsafe-inline'; style-src 'self' 'unsafe-inline'; img-src 'self' data:"
    };

    vec![
        (
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static(csp),
        ),
        (
            axum::http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ),
        (
            axum::http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (
            axum::http::header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ),
    ]
}
