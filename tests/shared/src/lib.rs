//! Shared helpers for end-to-end tests: an in-process server on an
//! ephemeral port and a calculator method set to run against it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result, anyhow};
use rpcwire_http_server::{HttpRpcServerBuilder, RpcError};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

/// Initialize logging once per test binary
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A server running inside the test process
pub struct TestServer {
    addr: SocketAddr,
    rpc_path: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<rpcwire_http_server::Result<()>>>,
}

impl TestServer {
    /// Bind 127.0.0.1 on a free port and serve the built server there
    pub async fn start(builder: HttpRpcServerBuilder) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("binding test listener")?;
        let addr = listener.local_addr()?;

        let server = builder.bind_address(addr).build();
        let rpc_path = server.config().rpc_path.clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!("Test server started on {}", addr);
        Ok(Self {
            addr,
            rpc_path,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// URL of the JSON-RPC endpoint
    pub fn url(&self) -> String {
        self.url_for(&self.rpc_path)
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Stop accepting connections and wait for the accept loop to end
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.handle.take() {
            Some(handle) => handle
                .await
                .context("server task panicked")?
                .map_err(|e| anyhow!("server failed: {}", e)),
            None => Ok(()),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Operands {
    pub a: f64,
    pub b: f64,
}

/// Calculator methods plus a few that fail on purpose.
///
/// `record` counts its calls into `counter` so notifications can be observed.
pub fn calculator(counter: Arc<AtomicUsize>) -> HttpRpcServerBuilder {
    HttpRpcServerBuilder::new()
        .register_typed("add", |p: Operands| Ok::<_, RpcError>(p.a + p.b))
        .register_typed("subtract", |p: Operands| Ok::<_, RpcError>(p.a - p.b))
        .register_typed("divide", |p: Operands| {
            if p.b == 0.0 {
                return Err(RpcError::application(
                    1,
                    "division by zero",
                    Some(json!({"dividend": p.a})),
                ));
            }
            Ok(p.a / p.b)
        })
        .register_typed("echo", |value: Value| Ok::<_, RpcError>(value))
        .register_fn("fail", |_| {
            Err(anyhow!("backend unavailable").context("loading ledger").into())
        })
        .register_fn("explode", |_| panic!("handler blew up"))
        .register_fn("record", move |_| {
            Ok(json!(counter.fetch_add(1, Ordering::SeqCst) + 1))
        })
}
