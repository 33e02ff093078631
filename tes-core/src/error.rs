//! Error taxonomy and HTTP response conversion.
//!
//! One enum variant per error class this service distinguishes; every
//! variant knows how to render its own status code, JSON body, and the
//! structured log event a 4xx/5xx response must leave behind. All fallible
//! code in this crate returns `Result<T, Error>` and propagates with `?`.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::headers::api_metadata_headers;

pub type Result<T> = std::result::Result<T, Error>;

/// The error taxonomy. Each variant maps onto exactly one of the nine
/// classes handled uniformly by the dispatcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad or missing parameter.
    #[error("validation failed for field `{field}`: expected {expected}, got `{value}`")]
    Validation {
        field: String,
        value: String,
        expected: String,
    },

    /// Missing or invalid developer token.
    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    /// Origin not allowed, CSRF missing/invalid, or token reused.
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    /// Unknown path or unknown named subresource.
    #[error("not found: {hint}")]
    NotFound { hint: String },

    /// Rate limit exceeded for the bucket named in `limiter`.
    #[error("rate limited on `{limiter}`")]
    RateLimited {
        limiter: String,
        retry_after_secs: u64,
        limit: u32,
        remaining: u32,
        reset_ms: u64,
    },

    /// Method not allowed for the matched route.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Handler deadline elapsed.
    #[error("request timed out")]
    RequestTimeout,

    /// Warmup incomplete or sibling telemetry service unreachable.
    #[error("service unavailable: {reason}")]
    ServiceUnavailable { reason: String, retry_after_secs: u64 },

    /// Anything uncaught. Carries a developer-facing detail string that is
    /// only ever surfaced when `Config::is_production()` is false.
    #[error("internal error: {detail}")]
    Internal { detail: String },

    /// Configuration failed to load at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure (static file serving, worker process stdio).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn validation(field: impl Into<String>, value: impl Into<String>, expected: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Error::Unauthorized { reason: reason.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Error::Forbidden { reason: reason.into() }
    }

    pub fn not_found(hint: impl Into<String>) -> Self {
        Error::NotFound { hint: hint.into() }
    }

    pub fn service_unavailable(reason: impl Into<String>, retry_after_secs: u64) -> Self {
        Error::ServiceUnavailable {
            reason: reason.into(),
            retry_after_secs,
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Error::Internal { detail: detail.into() }
    }

    /// The status code this variant renders as.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Error::Forbidden { .. } => StatusCode::FORBIDDEN,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            Error::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal { .. } | Error::Config(_) | Error::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Log this error as the structured event required by the error-handling
    /// design: `{threadGroup, threadId, channel, event, ...payload, ts}`.
    /// `threadGroup`/`threadId` are populated from the current tokio task;
    /// `channel` names the logical subsystem the error originated in.
    pub fn log_structured_event(&self, channel: &str) {
        let task_id = format!("{:?}", tokio::task::id());
        let ts = chrono::Utc::now().timestamp_millis();
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(
                thread_group = "tes-core",
                thread_id = %task_id,
                channel,
                event = "request_error",
                status = status.as_u16(),
                error = %self,
                ts,
            );
        } else {
            tracing::warn!(
                thread_group = "tes-core",
                thread_id = %task_id,
                channel,
                event = "request_error",
                status = status.as_u16(),
                error = %self,
                ts,
            );
        }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// JSON error body shape shared by every taxonomy member.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub status: u16,
}

impl ErrorResponse {
    fn simple(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
            value: None,
            expected: None,
            status: status.as_u16(),
        }
    }
}

/// Whether an uncaught `Error` should render the development-mode HTML
/// stack trace instead of the generic production JSON body. Set once at
/// boot from `Config::is_production()`; a global flag rather than a
/// parameter threaded through every handler, since the render mode never
/// changes after startup.
static DEVELOPMENT_MODE: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

pub fn set_development_mode(is_development: bool) {
    DEVELOPMENT_MODE.store(is_development, std::sync::atomic::Ordering::SeqCst);
}

fn is_development_mode() -> bool {
    DEVELOPMENT_MODE.load(std::sync::atomic::Ordering::SeqCst)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        self.log_structured_event("dispatcher");
        let status = self.status_code();

        let mut response = match &self {
            Error::Validation { field, value, expected } => Json(ErrorResponse {
                error: self.to_string(),
                field: Some(field.clone()),
                value: Some(value.clone()),
                expected: Some(expected.clone()),
                status: status.as_u16(),
            })
            .into_response(),
            Error::RateLimited {
                limiter,
                retry_after_secs,
                limit,
                remaining,
                reset_ms,
            } => {
                let mut resp = if limiter == "dashboard" {
                    Html(DASHBOARD_RATE_LIMITED_HTML).into_response()
                } else {
                    Json(ErrorResponse::simple(status, self.to_string())).into_response()
                };
                let headers = resp.headers_mut();
                headers.insert("Retry-After", HeaderValue::from(*retry_after_secs));
                headers.insert("X-RateLimit-Limit", HeaderValue::from(*limit));
                headers.insert("X-RateLimit-Remaining", HeaderValue::from(*remaining));
                headers.insert(
                    "X-RateLimit-Reset",
                    HeaderValue::from_str(&reset_ms.to_string()).unwrap(),
                );
                resp
            }
            Error::ServiceUnavailable { retry_after_secs, .. } => {
                let mut resp = Json(ErrorResponse::simple(status, self.to_string())).into_response();
                resp.headers_mut()
                    .insert("Retry-After", HeaderValue::from(*retry_after_secs));
                resp
            }
            Error::Internal { detail } if is_development_mode() => Html(format!(
                "<html><body><h1>500 Internal Server Error</h1><pre>{}</pre></body></html>",
                html_escape(detail)
            ))
            .into_response(),
            _ => Json(ErrorResponse::simple(status, self.to_string())).into_response(),
        };

        *response.status_mut() = status;
        for (name, value) in api_metadata_headers() {
            response.headers_mut().insert(name, value);
        }
        response
    }
}

/// Static body for the dashboard's rate-limit bucket, which (unlike the
/// `api`/`worker-snapshot` buckets) fronts a browser rather than an API
/// client.
const DASHBOARD_RATE_LIMITED_HTML: &str = concat!(
    "<!doctype html><html><head><title>Too Many Requests</title></head>",
    "<body><h1>429 Too Many Requests</h1>",
    "<p>You're refreshing the dashboard too quickly. Please wait a moment and try again.</p>",
    "</body></html>",
);

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn validation_error_renders_400_with_field_context() {
        let err = Error::validation("conflict", "abc", "float in [0,1]");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rate_limited_sets_retry_headers() {
        let err = Error::RateLimited {
            limiter: "dashboard".into(),
            retry_after_secs: 9,
            limit: 60,
            remaining: 0,
            reset_ms: 1_700_000_000_000,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("Retry-After").unwrap(), "9");
        assert_eq!(response.headers().get("X-RateLimit-Remaining").unwrap(), "0");
    }

    #[test]
    fn dashboard_rate_limit_renders_html_not_json() {
        let err = Error::RateLimited {
            limiter: "dashboard".into(),
            retry_after_secs: 9,
            limit: 60,
            remaining: 0,
            reset_ms: 1_700_000_000_000,
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let content_type = response.headers().get(axum::http::header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/html"));
    }

    #[test]
    fn non_dashboard_rate_limit_renders_json() {
        let err = Error::RateLimited {
            limiter: "api".into(),
            retry_after_secs: 1,
            limit: 100,
            remaining: 0,
            reset_ms: 1_700_000_000_000,
        };
        let response = err.into_response();
        let content_type = response.headers().get(axum::http::header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("application/json"));
    }

    #[test]
    fn every_error_response_carries_api_metadata_headers() {
        let err = Error::not_found("no such route");
        let response = err.into_response();
        assert!(response.headers().contains_key("X-API-Version"));
    }
}
