//! # Calculator JSON-RPC Server
//!
//! Serves a handful of calculator methods over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p rpcwire-http-server --example calculator_server -- --port 8080
//!
//! curl -s -d '{"jsonrpc":"2.0","method":"add","params":[1,2],"id":1}' \
//!     http://127.0.0.1:8080/jsonrpc
//! curl -s 'http://127.0.0.1:8080/jsonrpc?jsonrpc=2.0&method=add&params=%5B1,2%5D&id=1'
//! ```

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use rpcwire_http_server::{HttpRpcServer, RpcError};
use serde_json::{Value, json};
use tracing::info;

#[derive(Parser)]
#[command(name = "calculator-server", about = "Calculator JSON-RPC server")]
struct Args {
    /// Address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// JSON-RPC endpoint path; `/` serves every path
    #[arg(long, default_value = "/jsonrpc")]
    path: String,

    /// Do not gzip responses
    #[arg(long)]
    no_gzip: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let bind_address = SocketAddr::new(args.host, args.port);
    let server = HttpRpcServer::builder()
        .bind_address(bind_address)
        .rpc_path(args.path)
        .gzip_responses(!args.no_gzip)
        .register_typed("add", |(a, b): (f64, f64)| Ok::<_, RpcError>(a + b))
        .register_typed("subtract", |(a, b): (f64, f64)| Ok::<_, RpcError>(a - b))
        .register_typed("multiply", |(a, b): (f64, f64)| Ok::<_, RpcError>(a * b))
        .register_typed("divide", |(a, b): (f64, f64)| {
            if b == 0.0 {
                return Err(RpcError::application(
                    1,
                    "division by zero",
                    Some(json!({"dividend": a})),
                ));
            }
            Ok(a / b)
        })
        .register_fn("ping", |_| Ok(Value::String("pong".to_string())))
        .build();

    info!("Starting calculator server on {}", bind_address);
    server
        .run()
        .await
        .with_context(|| format!("calculator server on {} failed", bind_address))
}
