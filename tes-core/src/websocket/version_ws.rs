//! `/api/dev/version-ws`: privileged upgrade requiring a one-time CSRF
//! token and a Host-header check.

use axum::extract::ws::WebSocket;
use axum::http::HeaderMap;

use crate::csrf::CsrfStore;
use crate::error::{Error, Result};

pub const SUBPROTOCOLS: [&str; 2] = ["tes-ui-v2", "tes-ui-v1"];

/// Validates the upgrade request before the socket is accepted: a CSRF
/// token (query parameter or `x-tes-ws-csrf-token` header) consumed exactly
/// once, and, if the `Host` header is not localhost, that it matches the
/// URL host the client connected to.
pub fn authorize_upgrade(
    csrf: &CsrfStore,
    headers: &HeaderMap,
    query_token: Option<&str>,
    url_host: &str,
) -> Result<()> {
    let token = query_token
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-tes-ws-csrf-token")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .ok_or_else(|| Error::forbidden("missing CSRF token"))?;

    if !csrf.verify_and_consume(&token) {
        return Err(Error::forbidden("CSRF token missing, invalid, or already used"));
    }

    if let Some(host_header) = headers.get(axum::http::header::HOST).and_then(|v| v.to_str().ok()) {
        let is_local = host_header.starts_with("localhost") || host_header.starts_with("127.0.0.1");
        if !is_local && host_header != url_host {
            return Err(Error::validation("host", host_header, format!("to equal `{url_host}`")));
        }
    }

    Ok(())
}

pub async fn handle(mut socket: WebSocket) {
    use axum::extract::ws::Message;
    loop {
        match socket.recv().await {
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => {}
            Some(Err(_)) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_forbidden() {
        let csrf = CsrfStore::new();
        let headers = HeaderMap::new();
        assert!(authorize_upgrade(&csrf, &headers, None, "localhost:3002").is_err());
    }

    #[test]
    fn valid_query_token_is_accepted_once() {
        let csrf = CsrfStore::new();
        let token = csrf.issue();
        let headers = HeaderMap::new();
        assert!(authorize_upgrade(&csrf, &headers, Some(&token), "localhost:3002").is_ok());
        assert!(authorize_upgrade(&csrf, &headers, Some(&token), "localhost:3002").is_err());
    }

    #[test]
    fn mismatched_host_header_is_rejected() {
        let csrf = CsrfStore::new();
        let token = csrf.issue();
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::HOST, "evil.example".parse().unwrap());
        assert!(authorize_upgrade(&csrf, &headers, Some(&token), "localhost:3002").is_err());
    }
}
