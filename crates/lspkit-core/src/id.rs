//! The JSON-RPC request id: a string or an integer.
//!
//! lspkit always generates string ids (a fresh UUID per request), except
//! for the two reserved handshake ids `"initialize"` and `"shutdown"`. The
//! wire format still accepts either shape on the way in, and `RequestId::Int`
//! and `RequestId::Str("0")` are deliberately distinct keys in the pending
//! table — an integer `0` must never collide with the string `"0"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Int(i64),
    Str(String),
}

impl RequestId {
    /// A fresh id for an outbound request: a freshly generated UUID.
    pub fn new() -> Self {
        RequestId::Str(Uuid::new_v4().to_string())
    }

    /// Reserved id for the `initialize` handshake request.
    pub fn initialize() -> Self {
        RequestId::Str("initialize".to_string())
    }

    /// Reserved id for the `shutdown` handshake request.
    pub fn shutdown() -> Self {
        RequestId::Str("shutdown".to_string())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Int(n) => write!(f, "RequestId::Int({n})"),
            RequestId::Str(s) => write!(f, "RequestId::Str({s:?})"),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Int(n) => write!(f, "{n}"),
            RequestId::Str(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_zero_and_string_zero_are_distinct() {
        assert_ne!(RequestId::Int(0), RequestId::Str("0".to_string()));
    }

    #[test]
    fn fresh_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn reserved_ids_round_trip_through_json() {
        let encoded = serde_json::to_value(RequestId::initialize()).unwrap();
        assert_eq!(encoded, serde_json::json!("initialize"));
        let decoded: RequestId = serde_json::from_value(serde_json::json!(7)).unwrap();
        assert_eq!(decoded, RequestId::Int(7));
    }
}
