//! Error types for client operations

use rpcwire_json_rpc::compression::GunzipError;
use rpcwire_json_rpc::{JsonRpcErrorCode, RequestId, RpcError};
use thiserror::Error;

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with an error, or the exchange broke the protocol
    #[error(transparent)]
    Rpc(#[from] RpcError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response answers a different request
    #[error("Response id {actual} does not match request id {expected}")]
    IdMismatch { expected: RequestId, actual: RequestId },

    /// The server sent an empty body where a response was due
    #[error("Server sent no response")]
    EmptyResponse,

    /// A batch came back for a single call
    #[error("Unexpected batch response to a single call")]
    UnexpectedBatch,
}

/// Transport-specific errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("Response body exceeds {limit} bytes")]
    ResponseTooLarge { limit: usize },
}

impl From<GunzipError> for TransportError {
    fn from(error: GunzipError) -> Self {
        match error {
            GunzipError::TooLarge { limit } => Self::ResponseTooLarge { limit },
            GunzipError::Invalid(error) => Self::Compression(error),
        }
    }
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// The JSON-RPC error, if this is one
    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            Self::Rpc(error) => Some(error),
            _ => None,
        }
    }

    /// Error kind of a JSON-RPC error
    pub fn kind(&self) -> Option<JsonRpcErrorCode> {
        self.rpc_error().map(|error| error.kind)
    }

    /// Get the error code if this is a JSON-RPC error
    pub fn error_code(&self) -> Option<i64> {
        self.rpc_error().map(RpcError::code)
    }

    /// Check if the error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(TransportError::ConnectionFailed(_) | TransportError::Timeout)
        )
    }
}
