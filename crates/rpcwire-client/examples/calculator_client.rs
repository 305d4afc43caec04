//! Calls the calculator server example.
//!
//! ```bash
//! cargo run -p rpcwire-http-server --example calculator_server
//! cargo run -p rpcwire-client --example calculator_client -- http://127.0.0.1:8080/jsonrpc
//! ```

use std::time::Duration;

use rpcwire_client::{CallSpec, ClientConfig, HttpClient};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let server_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080/jsonrpc".to_string());

    let client = HttpClient::new(
        ClientConfig::builder(&server_url)
            .gzip(true)
            .timeout(Duration::from_secs(10))
            .build(),
    )?;
    println!("Server URL: {}", client.endpoint());

    let sum = client.call("add", vec![json!(1), json!(2)]).await?;
    println!("add(1, 2) = {}", sum);

    let product: f64 = client.call_typed("multiply", (6, 7)).await?;
    println!("multiply(6, 7) = {}", product);

    match client.call("divide", vec![json!(1), json!(0)]).await {
        Ok(value) => println!("divide(1, 0) = {}", value),
        Err(err) => println!("divide(1, 0) failed: {}", err),
    }

    let responses = client
        .call_batch(vec![
            CallSpec::new("subtract").arg(10).arg(4),
            CallSpec::new("ping").as_notification(),
            CallSpec::new("unknown"),
        ])
        .await?;
    for response in responses {
        match response.into_result() {
            Ok(value) => println!("batch result: {}", value),
            Err(err) => println!("batch error: {}", err),
        }
    }

    client.notify("ping", vec![]).await?;
    println!("statistics: {:?}", client.statistics());
    Ok(())
}
