//! # JSON-RPC Protocol Core
//!
//! A transport-agnostic JSON-RPC implementation speaking both the 1.0 and the
//! 2.0 dialect. This crate provides the wire types, the request and response
//! codecs and a synchronous method dispatcher, without any transport code.
//!
//! ## Features
//! - Single calls, batches and notifications
//! - Positional or keyword parameters, optionally decoded into serde types
//! - Reserved error codes as a closed set of kinds, everything else as application errors
//! - Method failures and panics are always answered with a JSON-RPC error
//! - A bounded gzip codec for transports that compress payloads
//!
//! ```rust
//! use rpcwire_json_rpc::prelude::*;
//!
//! let mut dispatcher = JsonRpcDispatcher::new();
//! dispatcher.register_typed("add", |(a, b): (i64, i64)| Ok::<_, RpcError>(a + b));
//!
//! let reply = dispatcher.dispatch(r#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 1}"#);
//! assert_eq!(reply.as_deref(), Some(r#"{"jsonrpc":"2.0","result":3,"id":1}"#));
//! ```

pub mod compression;
pub mod dispatch;
pub mod error;
pub mod prelude;
pub mod request;
pub mod response;
pub mod types;

// Re-export main types
pub use dispatch::{FunctionHandler, JsonRpcDispatcher, JsonRpcHandler, TypedHandler};
pub use error::{JsonRpcErrorCode, JsonRpcErrorObject, RpcError};
pub use request::{CallSpec, IncomingRequest, JsonRpcRequest, RejectedRequest, RequestParams};
pub use response::{JsonRpcResponse, ResponseMessage, ResponseOutcome};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}
