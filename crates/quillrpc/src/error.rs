use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved JSON-RPC 2.0 error codes.
pub mod codes {
    /// Invalid JSON was received by the server.
    pub const PARSE_ERROR: i64 = -32700;

    /// The JSON sent is not a valid Request object.
    pub const INVALID_REQUEST: i64 = -32600;

    /// The method does not exist / is not available.
    pub const METHOD_NOT_FOUND: i64 = -32601;

    /// Invalid method parameter(s).
    pub const INVALID_PARAMS: i64 = -32602;

    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Reserved for implementation-defined server errors.
    pub const SERVER_ERROR: i64 = -32000;
}

/// Well-known error kinds with their reserved codes and default messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
}

impl ErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            ErrorCode::ParseError => codes::PARSE_ERROR,
            ErrorCode::InvalidRequest => codes::INVALID_REQUEST,
            ErrorCode::MethodNotFound => codes::METHOD_NOT_FOUND,
            ErrorCode::InvalidParams => codes::INVALID_PARAMS,
            ErrorCode::InternalError => codes::INTERNAL_ERROR,
            ErrorCode::ServerError => codes::SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Parse error",
            ErrorCode::InvalidRequest => "Invalid Request",
            ErrorCode::MethodNotFound => "Method not found",
            ErrorCode::InvalidParams => "Invalid params",
            ErrorCode::InternalError => "Internal error",
            ErrorCode::ServerError => "Server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// Error object carried in a response envelope.
///
/// Service authors return these from their methods to control the error code
/// on the wire; the reserved constructors exist for the runtime and the
/// generated dispatch code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// Integer error type indicator.
    pub code: i64,

    /// Short description of the error.
    pub message: String,

    /// Additional server-defined information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Error {
    /// User-defined error with an explicit code and message.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a `data` payload.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Reserved error with its default message.
    pub fn from_code(code: ErrorCode, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: code.message().to_string(),
            data,
        }
    }

    /// InvalidParams carrying the underlying decode failure in `data`.
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InvalidParams, Some(Value::String(detail.into())))
    }

    /// InternalError whose message is the wrapped error's text.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: codes::INTERNAL_ERROR,
            message: message.into(),
            data: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reserved_codes() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::ServerError.code(), -32000);
    }

    #[test]
    fn default_messages() {
        let err = Error::from_code(ErrorCode::InvalidRequest, None);
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"code": -32600, "message": "Invalid Request"})
        );
    }

    #[test]
    fn internal_error_uses_wrapped_text() {
        let err = Error::internal("divide by zero");
        assert_eq!(err.code, -32603);
        assert_eq!(err.message, "divide by zero");
    }

    #[test]
    fn user_error_round_trip() {
        let err = Error::new(401, "we do not serve 1").with_data(json!({"b": 1}));
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"code": 401, "message": "we do not serve 1", "data": {"b": 1}})
        );
        let back: Error = serde_json::from_value(value).unwrap();
        assert_eq!(back, err);
    }
}
