//! Simple Calculator JSON-RPC Example
//!
//! Registers a few calculator methods and feeds request text straight into
//! the dispatcher, printing what would go back over the wire.

use rpcwire_json_rpc::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

#[derive(Debug, Deserialize)]
struct Operands {
    a: f64,
    b: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut dispatcher = JsonRpcDispatcher::new();
    dispatcher.register_typed("add", |p: Operands| Ok::<_, RpcError>(json!({"result": p.a + p.b})));
    dispatcher.register_typed("subtract", |p: Operands| {
        Ok::<_, RpcError>(json!({"result": p.a - p.b}))
    });
    dispatcher.register_typed("divide", |p: Operands| {
        if p.b == 0.0 {
            return Err(RpcError::application(
                1,
                "division by zero",
                Some(json!({"a": p.a})),
            ));
        }
        Ok(json!({"result": p.a / p.b}))
    });
    dispatcher.register_fn("describe", |_| {
        Ok(Value::String("add, subtract and divide two numbers".to_string()))
    });

    info!(methods = ?dispatcher.registered_methods(), "calculator ready");

    let test_requests = [
        r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": 5, "b": 3}, "id": 1}"#,
        r#"{"jsonrpc": "2.0", "method": "subtract", "params": [10, 4], "id": 2}"#,
        r#"{"jsonrpc": "2.0", "method": "multiply", "params": {"a": 2, "b": 3}, "id": 3}"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": "invalid", "b": 5}, "id": 4}"#,
        r#"{"jsonrpc": "2.0", "method": "divide", "params": [1, 0], "id": 5}"#,
        r#"{"method": "describe", "params": [], "id": "legacy"}"#,
        r#"[{"jsonrpc": "2.0", "method": "add", "params": [1, 1], "id": 6}, {"jsonrpc": "2.0", "method": "describe"}]"#,
        r#"{"jsonrpc": "2.0", "method": "add", "params": "#,
    ];

    for (i, request_json) in test_requests.iter().enumerate() {
        println!("\n--- Test {} ---", i + 1);
        println!("Request:  {}", request_json);
        match dispatcher.dispatch(request_json) {
            Some(response_json) => println!("Response: {}", response_json),
            None => println!("Response: (none, notification)"),
        }
    }
}
