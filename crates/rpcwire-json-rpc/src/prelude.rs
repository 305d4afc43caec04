//! # JSON-RPC Prelude
//!
//! Convenient re-exports of the most commonly used types.
//!
//! ```rust
//! use rpcwire_json_rpc::prelude::*;
//! ```

pub use crate::dispatch::{JsonRpcDispatcher, JsonRpcHandler, from_params};
pub use crate::error::{JsonRpcErrorCode, JsonRpcErrorObject, RpcError};
pub use crate::request::{CallSpec, IncomingRequest, JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcResponse, ResponseMessage, ResponseOutcome};
pub use crate::types::{JsonRpcVersion, RequestId};

// Standard error codes
pub use crate::error_codes::*;
