use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, ErrorCode};

/// JSON-RPC 2.0 response envelope.
///
/// Exactly one of `result`/`error` is present on the wire. `result` may be
/// JSON `null` for void methods, which is distinct from it being absent.
///
/// <http://www.jsonrpc.org/specification#response_object>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "jsonrpc")]
    pub version: String,

    /// Echo of the request id; `null` when the id could not be determined
    /// (parse errors) or the failure happened before envelope validation.
    #[serde(default)]
    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl Response {
    /// Success envelope around an already-marshalled value.
    pub fn success(result: Value) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            id: Value::Null,
            result: Some(result),
            error: None,
        }
    }

    /// Marshal a method's data return into a success envelope. A marshalling
    /// failure becomes ServerError.
    pub fn result<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Self::success(value),
            Err(err) => Self::from_error(
                Error::from_code(ErrorCode::ServerError, None).with_data(err.to_string()),
            ),
        }
    }

    /// Error envelope carrying the given error object verbatim.
    pub fn from_error(error: Error) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            id: Value::Null,
            result: None,
            error: Some(error),
        }
    }

    /// Reserved error with its default message and optional data payload.
    pub fn error_code(code: ErrorCode, data: Option<Value>) -> Self {
        Self::from_error(Error::from_code(code, data))
    }

    /// InvalidParams with decode detail in `data`.
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::from_error(Error::invalid_params(detail))
    }

    /// InternalError whose message is the given error text. This is how plain
    /// (non-library) method errors reach the wire.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::from_error(Error::internal(message))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Serialized envelope bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Response contains only tree-shaped JSON values, serialization
        // cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }
}
