//! HTTP JSON-RPC server
//!
//! Every accepted connection gets its own task; dispatch itself runs on the
//! blocking pool, so slow methods never hold up other connections.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use rpcwire_json_rpc::{JsonRpcDispatcher, JsonRpcHandler, RequestParams, RpcError};
use serde_json::Value;

use crate::{HttpServerError, Result, RpcHttpHandler};

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path of the JSON-RPC endpoint; `/` serves every path
    pub rpc_path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Origin allowed by CORS; any origin (`*`) when unset
    pub cors_origin: Option<String>,
    /// Maximum request body size, before and after decompression
    pub max_body_size: usize,
    /// gzip responses for clients that accept it
    pub gzip_responses: bool,
}

impl ServerConfig {
    pub fn serves_path(&self, path: &str) -> bool {
        self.rpc_path == "/" || self.rpc_path == path
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            rpc_path: "/jsonrpc".to_string(),
            enable_cors: true,
            cors_origin: None,
            max_body_size: 1024 * 1024, // 1MB
            gzip_responses: true,
        }
    }
}

/// Builder for the HTTP JSON-RPC server
#[derive(Default)]
pub struct HttpRpcServerBuilder {
    config: ServerConfig,
    dispatcher: JsonRpcDispatcher,
}

impl HttpRpcServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve an already populated dispatcher
    pub fn with_dispatcher(dispatcher: JsonRpcDispatcher) -> Self {
        Self {
            config: ServerConfig::default(),
            dispatcher,
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path
    pub fn rpc_path(mut self, path: impl Into<String>) -> Self {
        self.config.rpc_path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Allow a single CORS origin instead of any
    pub fn cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.enable_cors = true;
        self.config.cors_origin = Some(origin.into());
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Enable or disable gzip responses
    pub fn gzip_responses(mut self, enable: bool) -> Self {
        self.config.gzip_responses = enable;
        self
    }

    /// Register a JSON-RPC handler for a method
    pub fn register_method<H>(mut self, method: impl Into<String>, handler: H) -> Self
    where
        H: JsonRpcHandler + 'static,
    {
        self.dispatcher.register_method(method, handler);
        self
    }

    /// Register one handler for several methods
    pub fn register_handler<H>(mut self, methods: Vec<String>, handler: H) -> Self
    where
        H: JsonRpcHandler + 'static,
    {
        self.dispatcher.register_methods(methods, handler);
        self
    }

    /// Register a closure over raw params
    pub fn register_fn<F>(mut self, method: impl Into<String>, handler_fn: F) -> Self
    where
        F: Fn(Option<RequestParams>) -> std::result::Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.dispatcher.register_fn(method, handler_fn);
        self
    }

    /// Register a closure over typed params
    pub fn register_typed<P, R, E, F>(mut self, method: impl Into<String>, handler_fn: F) -> Self
    where
        P: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: Into<RpcError> + 'static,
        F: Fn(P) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.dispatcher.register_typed(method, handler_fn);
        self
    }

    /// Build the HTTP JSON-RPC server
    pub fn build(self) -> HttpRpcServer {
        let config = Arc::new(self.config);
        let handler = RpcHttpHandler::new(Arc::clone(&config), Arc::new(self.dispatcher));
        HttpRpcServer { config, handler }
    }
}

/// HTTP JSON-RPC server
#[derive(Clone)]
pub struct HttpRpcServer {
    config: Arc<ServerConfig>,
    handler: RpcHttpHandler,
}

impl HttpRpcServer {
    pub fn builder() -> HttpRpcServerBuilder {
        HttpRpcServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn handler(&self) -> &RpcHttpHandler {
        &self.handler
    }

    /// Bind the configured address and serve until the process ends
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serve connections until `shutdown` completes.
    ///
    /// Connections already accepted keep running to completion.
    pub async fn serve_with_shutdown<S>(&self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        info!("HTTP JSON-RPC server listening on {}", local_addr);
        info!("JSON-RPC endpoint available at: {}", self.config.rpc_path);
        info!(
            "Registered methods: {:?}",
            self.handler.dispatcher().registered_methods()
        );

        tokio::pin!(shutdown);
        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => accepted,
                () = &mut shutdown => {
                    info!("HTTP JSON-RPC server on {} shutting down", local_addr);
                    return Ok(());
                }
            };
            let (stream, peer_addr) = match accepted {
                Ok(connection) => connection,
                Err(err) => {
                    let delay = accept_retry_delay(&err);
                    warn!("Failed to accept connection, retrying in {:?}: {}", delay, err);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                if let Err(err) = serve_connection(stream, handler).await {
                    // Clients hanging up mid-request are routine
                    let err_str = err.to_string();
                    if err_str.contains("connection closed before message completed") {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}

/// How long to pause after a failed `accept`. Running out of file
/// descriptors clears up only as open connections finish.
fn accept_retry_delay(err: &std::io::Error) -> Duration {
    const EMFILE: i32 = 24;
    const ENFILE: i32 = 23;
    match err.raw_os_error() {
        Some(EMFILE | ENFILE) => Duration::from_millis(500),
        _ => Duration::from_millis(10),
    }
}

async fn serve_connection(stream: tokio::net::TcpStream, handler: RpcHttpHandler) -> Result<()> {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let handler = handler.clone();
        async move { Ok::<_, std::convert::Infallible>(handler.handle_request(req).await) }
    });

    http1::Builder::new()
        .serve_connection(io, service)
        .await
        .map_err(HttpServerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.rpc_path, "/jsonrpc");
        assert!(config.enable_cors);
        assert!(config.cors_origin.is_none());
        assert!(config.gzip_responses);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_serves_path() {
        let config = ServerConfig::default();
        assert!(config.serves_path("/jsonrpc"));
        assert!(!config.serves_path("/"));

        let config = ServerConfig {
            rpc_path: "/".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.serves_path("/anything"));
    }

    #[test]
    fn test_builder() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 3000);
        let server = HttpRpcServer::builder()
            .bind_address(addr)
            .rpc_path("/api/rpc")
            .cors(false)
            .max_body_size(2048)
            .gzip_responses(false)
            .register_typed("add", |(a, b): (i64, i64)| Ok::<_, RpcError>(a + b))
            .register_fn("ping", |_| Ok(Value::String("pong".to_string())))
            .build();

        assert_eq!(server.config().bind_address, addr);
        assert_eq!(server.config().rpc_path, "/api/rpc");
        assert!(!server.config().enable_cors);
        assert!(!server.config().gzip_responses);
        assert_eq!(server.config().max_body_size, 2048);
        assert_eq!(
            server.handler().dispatcher().registered_methods(),
            vec!["add".to_string(), "ping".to_string()]
        );
    }

    #[test]
    fn test_accept_retry_delay() {
        let exhausted = std::io::Error::from_raw_os_error(24);
        assert_eq!(accept_retry_delay(&exhausted), Duration::from_millis(500));

        let reset = std::io::Error::from(std::io::ErrorKind::ConnectionAborted);
        assert_eq!(accept_retry_delay(&reset), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_serve_with_shutdown() {
        let server = HttpRpcServer::builder().build();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let result = server.serve_with_shutdown(listener, async {}).await;
        assert!(result.is_ok());
    }
}
