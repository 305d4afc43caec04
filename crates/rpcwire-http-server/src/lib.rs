//! # rpcwire HTTP server
//!
//! Serves a [`JsonRpcDispatcher`] over HTTP and CGI.
//!
//! ## Features
//! - POST bodies carrying single requests or batches, optionally gzipped
//! - GET requests built from `method`, `params`, `id` and `jsonrpc` query fields
//! - CORS support for browser-based clients
//! - One-shot CGI handling over stdin/stdout

pub mod cgi;
pub mod compression;
pub mod cors;
pub mod handler;
pub mod query;
pub mod server;

// Re-export main types
pub use cgi::handle_cgi_request;
pub use cors::CorsLayer;
pub use handler::RpcHttpHandler;
pub use query::{QueryError, request_from_query};
pub use server::{HttpRpcServer, HttpRpcServerBuilder, ServerConfig};

// Re-export foundational types
pub use rpcwire_json_rpc::{JsonRpcDispatcher, JsonRpcHandler, RpcError};

/// Result type for HTTP server operations
pub type Result<T> = std::result::Result<T, HttpServerError>;

/// HTTP server errors
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
