//! JSON-RPC client over a [`Transport`]

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use rpcwire_json_rpc::request::{self, CallSpec};
use rpcwire_json_rpc::response::{self, JsonRpcResponse, ResponseMessage};
use rpcwire_json_rpc::{RequestParams, RpcError};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpTransport, Transport, TransportStatistics};

/// JSON-RPC client.
///
/// Cloning is cheap; clones share the transport.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    /// Create a client posting to `config.url`
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self::with_transport(HttpTransport::new(&config)?))
    }

    /// Create a client over any transport
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    pub fn statistics(&self) -> TransportStatistics {
        self.transport.statistics()
    }

    /// Call a method with positional arguments
    pub async fn call(&self, method: &str, args: Vec<Value>) -> ClientResult<Value> {
        self.call_spec(CallSpec::new(method).args(args)).await
    }

    /// Call a method with keyword arguments
    pub async fn call_with_kwargs(&self, method: &str, kwargs: Map<String, Value>) -> ClientResult<Value> {
        self.call_spec(CallSpec::new(method).kwargs(kwargs)).await
    }

    /// Call a method with serde params and result.
    ///
    /// `params` must serialize to an array (positional) or an object (keyword).
    pub async fn call_typed<P, R>(&self, method: &str, params: P) -> ClientResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let spec = match RequestParams::from_value(serde_json::to_value(params)?) {
            Some(RequestParams::Array(args)) => CallSpec::new(method).args(args),
            Some(RequestParams::Object(kwargs)) => CallSpec::new(method).kwargs(kwargs),
            None => {
                return Err(RpcError::invalid_params("params must serialize to an array or an object").into());
            }
        };
        let result = self.call_spec(spec).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Make one call and return its result, or the error the server raised.
    ///
    /// A call marked as a notification is sent as one and yields `null`.
    pub async fn call_spec(&self, spec: CallSpec) -> ClientResult<Value> {
        let request = spec.into_request()?;
        if request.is_notification() {
            self.send_notification(serde_json::to_string(&request)?).await?;
            return Ok(Value::Null);
        }

        let expected = request.id.clone();
        debug!(method = %request.method, id = ?expected, "Calling JSON-RPC method");
        let text = self.transport.send(serde_json::to_string(&request)?).await?;
        if text.trim().is_empty() {
            return Err(ClientError::EmptyResponse);
        }

        let response = match response::decode(&text)? {
            ResponseMessage::Single(response) => response,
            ResponseMessage::Batch(_) => return Err(ClientError::UnexpectedBatch),
        };

        // An error answered with a null id could not be tied to the request
        if let (Some(expected), Some(actual)) = (expected, response.id.clone())
            && expected != actual
        {
            return Err(ClientError::IdMismatch { expected, actual });
        }

        Ok(response.into_result()?)
    }

    /// Send several calls in one request.
    ///
    /// Responses come back raw, in the order the server sent them; correlate
    /// them by id. Notifications in the batch get no response, and a batch of
    /// only notifications yields an empty list.
    pub async fn call_batch(&self, calls: Vec<CallSpec>) -> ClientResult<Vec<JsonRpcResponse>> {
        let requests = request::encode_batch(calls)?;
        debug!(size = requests.len(), "Sending JSON-RPC batch");
        let text = self.transport.send(serde_json::to_string(&requests)?).await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(response::decode(&text)?.into_responses())
    }

    /// Send a notification with positional arguments
    pub async fn notify(&self, method: &str, args: Vec<Value>) -> ClientResult<()> {
        let request = request::encode_notification(method, args, Map::new())?;
        self.send_notification(serde_json::to_string(&request)?).await
    }

    /// Send several notifications in one batch
    pub async fn notify_batch(&self, calls: Vec<CallSpec>) -> ClientResult<()> {
        let requests = request::encode_batch(calls.into_iter().map(CallSpec::as_notification).collect())?;
        self.send_notification(serde_json::to_string(&requests)?).await
    }

    async fn send_notification(&self, body: String) -> ClientResult<()> {
        let text = self.transport.send(body).await?;
        if !text.trim().is_empty() {
            debug!("Ignoring response body sent for a notification: {}", text);
        }
        Ok(())
    }
}
