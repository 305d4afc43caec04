//! Commonly used client types

pub use crate::client::HttpClient;
pub use crate::config::{ClientConfig, ClientConfigBuilder};
pub use crate::error::{ClientError, ClientResult, TransportError};
pub use crate::transport::{BoxedTransport, Transport};

pub use rpcwire_json_rpc::{CallSpec, JsonRpcErrorCode, JsonRpcResponse, RequestId, RpcError};
