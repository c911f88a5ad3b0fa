//! JSON-RPC 2.0 message model.
//!
//! Requests are decoded in two steps: the raw text must be a JSON object (otherwise the peer gets
//! a parse error), and the object must have the request shape (otherwise an invalid-request error
//! that still echoes whatever `id` could be read).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Left empty when absent so the dispatcher can answer with an invalid-request error.
    #[serde(default)]
    pub jsonrpc: String,
    pub method: String,
    /// `None` when the member is absent (a notification); `Some(Value::Null)` for `"id": null`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    #[must_use]
    pub fn new(id: Option<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            id,
            params,
        }
    }

    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to echo in a response (`null` for notifications).
    #[must_use]
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    #[must_use]
    pub fn new(code: ErrorCode, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data,
        }
    }
}

/// Outcome of dispatching one message.
///
/// `Empty` means nothing goes back on the wire (notifications, cancelled calls).
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcResponse {
    Empty,
    Success { id: Value, result: Value },
    Error { id: Value, error: JsonRpcError },
}

/// Borrowed wire form of a non-empty response.
#[derive(Debug, Serialize)]
pub struct WireResponse<'a> {
    pub jsonrpc: &'static str,
    pub id: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a JsonRpcError>,
}

impl JsonRpcResponse {
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self::Success { id, result }
    }

    #[must_use]
    pub fn error(id: Value, code: ErrorCode, data: Option<Value>) -> Self {
        Self::Error {
            id,
            error: JsonRpcError::new(code, data),
        }
    }

    /// A parse error never knows the request id.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::error(Value::Null, ErrorCode::ParseError, None)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    #[must_use]
    pub fn to_wire(&self) -> Option<WireResponse<'_>> {
        match self {
            Self::Empty => None,
            Self::Success { id, result } => Some(WireResponse {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: Some(result),
                error: None,
            }),
            Self::Error { id, error } => Some(WireResponse {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: None,
                error: Some(error),
            }),
        }
    }
}

/// Decode one message from raw text.
///
/// # Errors
///
/// Returns the error response to send back when the text is not a JSON object or the object is
/// not a request.
pub fn decode_request(raw: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(raw).map_err(|e| {
        debug!("rejecting unparseable message: {e}");
        JsonRpcResponse::parse_error()
    })?;
    decode_value(value)
}

/// Same as [`decode_request`] for a raw byte body.
///
/// # Errors
///
/// See [`decode_request`].
pub fn decode_request_slice(raw: &[u8]) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| {
        debug!("rejecting unparseable message: {e}");
        JsonRpcResponse::parse_error()
    })?;
    decode_value(value)
}

/// Decode an already parsed JSON value.
///
/// # Errors
///
/// See [`decode_request`].
pub fn decode_value(value: Value) -> Result<JsonRpcRequest, JsonRpcResponse> {
    if !value.is_object() {
        return Err(JsonRpcResponse::parse_error());
    }
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        debug!("rejecting malformed request: {e}");
        JsonRpcResponse::error(id, ErrorCode::InvalidRequest, Some(Value::String(e.to_string())))
    })
}
