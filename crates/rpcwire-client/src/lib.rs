//! # rpcwire client
//!
//! Calls JSON-RPC 1.0 and 2.0 servers over HTTP POST.
//!
//! ```no_run
//! use rpcwire_client::{ClientConfig, HttpClient};
//! use serde_json::json;
//!
//! # async fn example() -> rpcwire_client::ClientResult<()> {
//! let client = HttpClient::new(
//!     ClientConfig::builder("http://127.0.0.1:8080/jsonrpc")
//!         .basic_auth("user", "secret")
//!         .gzip(true)
//!         .build(),
//! )?;
//! let sum = client.call("add", vec![json!(1), json!(2)]).await?;
//! assert_eq!(sum, json!(3));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod transport;

pub use client::HttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, ClientResult, TransportError};
pub use transport::{HttpTransport, Transport, TransportStatistics};

pub use rpcwire_json_rpc::{CallSpec, JsonRpcResponse, RequestId, RpcError};
