//! One-time CSRF token store for privileged WebSocket upgrades and the
//! version-bump endpoint.
//!
//! Tokens are 256-bit random values, single-use, and expire after 5 minutes.
//! Storage is an in-process `DashMap`; there is no durability requirement
//! (a restart invalidates every outstanding token, which is correct: a
//! token's whole purpose is to prove the client round-tripped through this
//! process instance recently).

use std::time::{Duration, Instant};

use dashmap::DashMap;
use rand::RngCore;

const TOKEN_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
struct TokenRecord {
    issued_at: Instant,
    used: bool,
}

#[derive(Clone, Default)]
pub struct CsrfStore {
    tokens: std::sync::Arc<DashMap<String, TokenRecord>>,
}

impl CsrfStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a new token and records it as unused.
    #[must_use]
    pub fn issue(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex_encode(&bytes);
        self.tokens.insert(
            token.clone(),
            TokenRecord {
                issued_at: Instant::now(),
                used: false,
            },
        );
        token
    }

    /// Verifies and consumes `token`. Returns `true` exactly once per issued
    /// token, and only within the TTL window; every subsequent call (reuse,
    /// expiry, or an unknown token) returns `false`.
    pub fn verify_and_consume(&self, token: &str) -> bool {
        let Some(mut entry) = self.tokens.get_mut(token) else {
            return false;
        };
        if entry.used || entry.issued_at.elapsed() > TOKEN_TTL {
            return false;
        }
        entry.used = true;
        true
    }

    /// Drops expired and used entries; call periodically to bound memory.
    pub fn sweep(&self) {
        self.tokens
            .retain(|_, record| !record.used && record.issued_at.elapsed() <= TOKEN_TTL);
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(out, "{byte:02x}").expect("writing to String cannot fail");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_once() {
        let store = CsrfStore::new();
        let token = store.issue();
        assert!(store.verify_and_consume(&token));
    }

    #[test]
    fn reused_token_is_rejected() {
        let store = CsrfStore::new();
        let token = store.issue();
        assert!(store.verify_and_consume(&token));
        assert!(!store.verify_and_consume(&token));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = CsrfStore::new();
        assert!(!store.verify_and_consume("not-a-real-token"));
    }

    #[test]
    fn sweep_removes_used_tokens() {
        let store = CsrfStore::new();
        let token = store.issue();
        store.verify_and_consume(&token);
        store.sweep();
        assert!(!store.tokens.contains_key(&token));
    }
}
