//! The JSON-RPC 2.0 message envelope: request, notification, and response
//! (success or error), as a single tagged [`Message`] enum.

use lspkit_core::id::RequestId;
use lspkit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC error object, preserved verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcErrorPayload {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorPayload {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;
    pub const REQUEST_CANCELLED: i64 = -32800;
    pub const CONTENT_MODIFIED: i64 = -32801;

    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
            data: None,
        }
    }

    pub fn into_error(self) -> Error {
        Error::Rpc {
            code: self.code,
            message: self.message,
            data: self.data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestMessage {
    pub id: RequestId,
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone)]
pub struct NotificationMessage {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone)]
pub struct ResponseMessage {
    pub id: RequestId,
    pub payload: std::result::Result<Value, RpcErrorPayload>,
}

/// One JSON-RPC message, tagged by the shape the wire format carries.
#[derive(Debug, Clone)]
pub enum Message {
    Request(RequestMessage),
    Notification(NotificationMessage),
    Response(ResponseMessage),
}

impl Message {
    pub fn request(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        Message::Request(RequestMessage {
            id,
            method: method.into(),
            params,
        })
    }

    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Message::Notification(NotificationMessage {
            method: method.into(),
            params,
        })
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Message::Response(ResponseMessage {
            id,
            payload: Ok(result),
        })
    }

    pub fn error(id: RequestId, error: RpcErrorPayload) -> Self {
        Message::Response(ResponseMessage {
            id,
            payload: Err(error),
        })
    }
}

/// Untyped wire shape, used only to classify an incoming JSON object before
/// committing to one of the [`Message`] variants.
#[derive(Debug, Deserialize)]
struct Wire {
    #[serde(default)]
    id: Option<RequestId>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorPayload>,
}

impl Message {
    pub fn decode(bytes: &[u8]) -> Result<Message> {
        let wire: Wire =
            serde_json::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))?;
        match (wire.id, wire.method, wire.result, wire.error) {
            (Some(id), Some(method), _, _) => Ok(Message::Request(RequestMessage {
                id,
                method,
                params: wire.params.unwrap_or(Value::Null),
            })),
            (None, Some(method), _, _) => Ok(Message::Notification(NotificationMessage {
                method,
                params: wire.params.unwrap_or(Value::Null),
            })),
            (Some(id), None, Some(result), None) => {
                Ok(Message::Response(ResponseMessage { id, payload: Ok(result) }))
            }
            (Some(id), None, None, Some(error)) => {
                Ok(Message::Response(ResponseMessage { id, payload: Err(error) }))
            }
            (Some(id), None, None, None) => {
                // A success response with a `null` result still has no
                // `result` key present in the `Wire` struct's eyes only if
                // it is literally absent; treat `{"id":..}` with neither
                // result nor error as a null-result success, matching
                // lenient LSP servers.
                Ok(Message::Response(ResponseMessage {
                    id,
                    payload: Ok(Value::Null),
                }))
            }
            _ => Err(Error::Codec(
                "message matches neither request, notification, nor response shape".into(),
            )),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let value = match self {
            Message::Request(r) => serde_json::json!({
                "jsonrpc": "2.0",
                "id": r.id,
                "method": r.method,
                "params": r.params,
            }),
            Message::Notification(n) => serde_json::json!({
                "jsonrpc": "2.0",
                "method": n.method,
                "params": n.params,
            }),
            Message::Response(resp) => match &resp.payload {
                Ok(result) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": resp.id,
                    "result": result,
                }),
                Err(error) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": resp.id,
                    "error": error,
                }),
            },
        };
        serde_json::to_vec(&value).map_err(Error::from)
    }
}
