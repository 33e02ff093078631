//! Request identifiers.
//!
//! Request IDs use UUIDv7 for time-sortability, which makes log correlation
//! and ordering straightforward without any external lookup. The `req_`
//! prefix makes them visually distinct from other identifiers in logs.

use std::fmt;
use std::str::FromStr;

use http::Request;
use tower_http::request_id::{MakeRequestId, RequestId as TowerRequestId};
use uuid::Uuid;

/// A time-sortable request identifier: `req_<uuidv7>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub const PREFIX: &'static str = "req";

    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn prefix(&self) -> &'static str {
        Self::PREFIX
    }

    #[must_use]
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for RequestId {
    type Err = RequestIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((prefix, suffix)) = s.split_once('_') else {
            return Err(RequestIdError::Malformed);
        };
        if prefix != Self::PREFIX {
            return Err(RequestIdError::InvalidPrefix {
                expected: Self::PREFIX.to_string(),
                actual: prefix.to_string(),
            });
        }
        let uuid = Uuid::from_str(suffix).map_err(|_| RequestIdError::Malformed)?;
        Ok(Self(uuid))
    }
}

impl From<RequestId> for String {
    fn from(id: RequestId) -> Self {
        id.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RequestIdError {
    #[error("request ID is not in `prefix_uuid` form")]
    Malformed,
    #[error("invalid prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix { expected: String, actual: String },
}

/// `MakeRequestId` implementation wiring `RequestId` into
/// `tower_http::request_id::SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeTypedRequestId;

impl MakeRequestId for MakeTypedRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<TowerRequestId> {
        let id = RequestId::new();
        let header_value = http::HeaderValue::from_str(&id.to_string()).ok()?;
        Some(TowerRequestId::new(header_value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_has_req_prefix() {
        let id = RequestId::new();
        assert!(id.to_string().starts_with("req_"));
        assert_eq!(id.prefix(), "req");
    }

    #[test]
    fn parses_its_own_display_output() {
        let id = RequestId::new();
        let parsed = RequestId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn rejects_wrong_prefix() {
        let id = RequestId::new();
        let wrong = id.to_string().replacen("req_", "user_", 1);
        match RequestId::from_str(&wrong) {
            Err(RequestIdError::InvalidPrefix { expected, actual }) => {
                assert_eq!(expected, "req");
                assert_eq!(actual, "user");
            }
            other => panic!("expected InvalidPrefix, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(RequestId::from_str("req_not-a-uuid").is_err());
        assert!(RequestId::from_str("no-underscore").is_err());
    }

    #[test]
    fn ids_are_time_ordered() {
        let id1 = RequestId::new();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let id2 = RequestId::new();
        assert!(id1 < id2);
    }

    #[test]
    fn make_typed_request_id_sets_header() {
        let mut maker = MakeTypedRequestId;
        let request = http::Request::builder().body(()).unwrap();
        let id = maker.make_request_id(&request).unwrap();
        let header_value = id.into_header_value();
        assert!(header_value.to_str().unwrap().starts_with("req_"));
    }
}
