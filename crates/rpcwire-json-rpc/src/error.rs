use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;

/// JSON-RPC error kinds.
///
/// The five reserved codes have their own variant; every other code is an
/// application error carrying the code it was raised with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Application(i64),
}

impl JsonRpcErrorCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            error_codes::PARSE_ERROR => JsonRpcErrorCode::ParseError,
            error_codes::INVALID_REQUEST => JsonRpcErrorCode::InvalidRequest,
            error_codes::METHOD_NOT_FOUND => JsonRpcErrorCode::MethodNotFound,
            error_codes::INVALID_PARAMS => JsonRpcErrorCode::InvalidParams,
            error_codes::INTERNAL_ERROR => JsonRpcErrorCode::InternalError,
            other => JsonRpcErrorCode::Application(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::Application(_) => "Application error",
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, JsonRpcErrorCode::Application(_))
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object as it appears on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A protocol-level failure.
///
/// Produced by the codecs and the dispatcher on the server side, and by
/// decoding an error response on the client side.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("JSON-RPC error {}: {}", .kind.code(), .message)]
pub struct RpcError {
    pub kind: JsonRpcErrorCode,
    pub message: String,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(kind: JsonRpcErrorCode, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            kind,
            message: message.into(),
            data,
        }
    }

    /// Error of the given kind with its standard message and a diagnostic `data` string
    fn standard(kind: JsonRpcErrorCode, detail: impl fmt::Display) -> Self {
        Self::new(kind, kind.message(), Some(Value::String(detail.to_string())))
    }

    pub fn parse_error(detail: impl fmt::Display) -> Self {
        Self::standard(JsonRpcErrorCode::ParseError, detail)
    }

    pub fn invalid_request(detail: impl fmt::Display) -> Self {
        Self::standard(JsonRpcErrorCode::InvalidRequest, detail)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::MethodNotFound,
            format!("Method '{}' not found", method),
            None,
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, message, None)
    }

    pub fn internal_error(detail: impl fmt::Display) -> Self {
        Self::standard(JsonRpcErrorCode::InternalError, detail)
    }

    /// Caller-defined error. Reserved codes are mapped back to their own kind.
    pub fn application(code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::from_code(code), message, data)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> i64 {
        self.kind.code()
    }

    pub fn from_object(object: JsonRpcErrorObject) -> Self {
        Self::new(
            JsonRpcErrorCode::from_code(object.code),
            object.message,
            object.data,
        )
    }

    pub fn to_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject {
            code: self.code(),
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }
}

impl From<JsonRpcErrorObject> for RpcError {
    fn from(object: JsonRpcErrorObject) -> Self {
        Self::from_object(object)
    }
}

impl From<RpcError> for JsonRpcErrorObject {
    fn from(error: RpcError) -> Self {
        Self {
            code: error.kind.code(),
            message: error.message,
            data: error.data,
        }
    }
}

/// Handler failures without a protocol meaning become internal errors
impl From<anyhow::Error> for RpcError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(
            JsonRpcErrorCode::InternalError,
            error.to_string(),
            Some(Value::String(format!("{:#}", error))),
        )
    }
}
