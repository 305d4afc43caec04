//! Method registry and request dispatch.
//!
//! Dispatch is synchronous: a call runs to completion on the calling thread.
//! Register every method before sharing the dispatcher between threads; the
//! registry is read-only while serving.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::error::{JsonRpcErrorCode, RpcError};
use crate::request::{self, IncomingRequest, JsonRpcRequest, RejectedRequest, RequestParams};
use crate::response::{JsonRpcResponse, ResponseMessage};

/// Trait for handling JSON-RPC method calls
pub trait JsonRpcHandler: Send + Sync {
    /// Handle a call. `method` is the name the handler was reached under.
    fn handle(&self, method: &str, params: Option<RequestParams>) -> Result<Value, RpcError>;
}

/// Handler over raw params
pub struct FunctionHandler<F> {
    handler_fn: F,
}

impl<F> FunctionHandler<F>
where
    F: Fn(Option<RequestParams>) -> Result<Value, RpcError> + Send + Sync,
{
    pub fn new(handler_fn: F) -> Self {
        Self { handler_fn }
    }
}

impl<F> JsonRpcHandler for FunctionHandler<F>
where
    F: Fn(Option<RequestParams>) -> Result<Value, RpcError> + Send + Sync,
{
    fn handle(&self, _method: &str, params: Option<RequestParams>) -> Result<Value, RpcError> {
        (self.handler_fn)(params)
    }
}

/// Handler whose params and result are serde types.
///
/// Params that do not deserialize into `P` are answered with InvalidParams.
pub struct TypedHandler<P, R, E, F> {
    handler_fn: F,
    _marker: PhantomData<fn(P) -> Result<R, E>>,
}

impl<P, R, E, F> TypedHandler<P, R, E, F>
where
    P: DeserializeOwned,
    R: Serialize,
    E: Into<RpcError>,
    F: Fn(P) -> Result<R, E> + Send + Sync,
{
    pub fn new(handler_fn: F) -> Self {
        Self {
            handler_fn,
            _marker: PhantomData,
        }
    }
}

impl<P, R, E, F> JsonRpcHandler for TypedHandler<P, R, E, F>
where
    P: DeserializeOwned,
    R: Serialize,
    E: Into<RpcError>,
    F: Fn(P) -> Result<R, E> + Send + Sync,
{
    fn handle(&self, method: &str, params: Option<RequestParams>) -> Result<Value, RpcError> {
        let args: P = from_params(params)?;
        let result = (self.handler_fn)(args).map_err(Into::into)?;
        serde_json::to_value(result).map_err(|e| {
            RpcError::internal_error(format!("result of '{}' is not serializable: {}", method, e))
        })
    }
}

/// Deserialize request params into a typed argument set.
///
/// Positional arrays fill tuples or struct fields in order, keyword maps
/// fill struct fields by name. Missing params are tried as `null` and then
/// as an empty argument list.
pub fn from_params<P: DeserializeOwned>(params: Option<RequestParams>) -> Result<P, RpcError> {
    match params {
        Some(params) => serde_json::from_value(params.into_value())
            .map_err(|e| RpcError::invalid_params(e.to_string())),
        None => serde_json::from_value(Value::Null)
            .or_else(|_| serde_json::from_value(Value::Array(vec![])))
            .map_err(|e| RpcError::invalid_params(e.to_string())),
    }
}

/// JSON-RPC method dispatcher
#[derive(Default, Clone)]
pub struct JsonRpcDispatcher {
    handlers: HashMap<String, Arc<dyn JsonRpcHandler>>,
}

impl JsonRpcDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method, replacing any previous one
    pub fn register_method<H>(&mut self, method: impl Into<String>, handler: H)
    where
        H: JsonRpcHandler + 'static,
    {
        self.handlers.insert(method.into(), Arc::new(handler));
    }

    /// Register one handler under several method names
    pub fn register_methods<H>(&mut self, methods: Vec<String>, handler: H)
    where
        H: JsonRpcHandler + 'static,
    {
        let handler_arc: Arc<dyn JsonRpcHandler> = Arc::new(handler);
        for method in methods {
            self.handlers.insert(method, Arc::clone(&handler_arc));
        }
    }

    /// Register a closure over raw params
    pub fn register_fn<F>(&mut self, method: impl Into<String>, handler_fn: F)
    where
        F: Fn(Option<RequestParams>) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        self.register_method(method, FunctionHandler::new(handler_fn));
    }

    /// Register a closure over typed params
    pub fn register_typed<P, R, E, F>(&mut self, method: impl Into<String>, handler_fn: F)
    where
        P: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: Into<RpcError> + 'static,
        F: Fn(P) -> Result<R, E> + Send + Sync + 'static,
    {
        self.register_method(method, TypedHandler::new(handler_fn));
    }

    /// Registered method names, sorted
    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.keys().cloned().collect();
        methods.sort();
        methods
    }

    pub fn has_method(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    /// Process request text. `None` means nothing is sent back.
    pub fn dispatch(&self, text: &str) -> Option<String> {
        let message = match request::decode(text) {
            Ok(incoming) => self.handle_message(incoming)?,
            Err(rpc_error) => {
                debug!(code = rpc_error.code(), "rejecting undecodable request");
                ResponseMessage::Single(JsonRpcResponse::error(None, rpc_error))
            }
        };
        Some(message.to_json_string())
    }

    /// Process a decoded message. Batches stay batches, even with one entry.
    pub fn handle_message(&self, incoming: IncomingRequest) -> Option<ResponseMessage> {
        match incoming {
            IncomingRequest::Single(entry) => self.handle_entry(entry).map(ResponseMessage::Single),
            IncomingRequest::Batch(entries) => {
                debug!(size = entries.len(), "processing batch");
                // Entries run in input order, one after another
                let responses: Vec<JsonRpcResponse> = entries
                    .into_iter()
                    .filter_map(|entry| self.handle_entry(entry))
                    .collect();
                if responses.is_empty() {
                    None
                } else {
                    Some(ResponseMessage::Batch(responses))
                }
            }
        }
    }

    fn handle_entry(&self, entry: Result<JsonRpcRequest, RejectedRequest>) -> Option<JsonRpcResponse> {
        match entry {
            Ok(request) => self.handle_request(request),
            Err(rejected) if rejected.notification => {
                debug!("dropping invalid notification: {}", rejected.error);
                None
            }
            Err(rejected) => Some(
                JsonRpcResponse::error(rejected.id, rejected.error).with_version(rejected.version),
            ),
        }
    }

    /// Process a single request. Notifications never produce a response.
    pub fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let JsonRpcRequest {
            version,
            id,
            method,
            params,
        } = request;

        let outcome = match self.handlers.get(&method) {
            Some(handler) => invoke(handler.as_ref(), &method, params),
            None => Err(RpcError::method_not_found(&method)),
        };

        if let Err(rpc_error) = &outcome {
            match rpc_error.kind {
                JsonRpcErrorCode::InternalError => {
                    warn!(method = %method, "method failed: {}", rpc_error.message)
                }
                _ => debug!(method = %method, code = rpc_error.code(), "method returned error"),
            }
        }

        let Some(id) = id else {
            debug!(method = %method, "notification handled, no response");
            return None;
        };

        let response = match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(rpc_error) => JsonRpcResponse::error(Some(id), rpc_error),
        };
        Some(response.with_version(version))
    }
}

/// Run a handler, turning a panic into an internal error
fn invoke(
    handler: &dyn JsonRpcHandler,
    method: &str,
    params: Option<RequestParams>,
) -> Result<Value, RpcError> {
    debug!(method = %method, "invoking method");
    panic::catch_unwind(AssertUnwindSafe(|| handler.handle(method, params))).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "method panicked".to_string());
        error!(method = %method, "method panicked: {}", detail);
        Err(RpcError::internal_error(detail))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{JsonRpcVersion, RequestId};
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct AddParams {
        a: i64,
        b: i64,
    }

    fn calculator() -> JsonRpcDispatcher {
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_typed("add", |p: AddParams| Ok::<_, RpcError>(p.a + p.b));
        dispatcher.register_typed("echo", |(text,): (String,)| Ok::<_, RpcError>(text));
        dispatcher.register_typed("ping", |_: ()| Ok::<_, RpcError>("pong"));
        dispatcher.register_fn("fail", |_| Err(RpcError::application(1001, "quota exceeded", None)));
        dispatcher.register_fn("boom", |_| panic!("kaboom"));
        dispatcher.register_typed("oops", |_: ()| -> anyhow::Result<i32> {
            Err(anyhow::anyhow!("ledger unavailable"))
        });
        dispatcher
    }

    fn dispatch_json(dispatcher: &JsonRpcDispatcher, text: &str) -> Option<Value> {
        dispatcher
            .dispatch(text)
            .map(|out| serde_json::from_str(&out).unwrap())
    }

    #[test]
    fn test_dispatcher_success() {
        let dispatcher = calculator();
        let response =
            dispatch_json(&dispatcher, r#"{"jsonrpc": "2.0", "method": "add", "params": [2, 3], "id": 1}"#)
                .unwrap();
        assert_eq!(response, json!({"jsonrpc": "2.0", "result": 5, "id": 1}));

        let response = dispatch_json(
            &dispatcher,
            r#"{"jsonrpc": "2.0", "method": "add", "params": {"a": 10, "b": 4}, "id": "k"}"#,
        )
        .unwrap();
        assert_eq!(response["result"], 14);
        assert_eq!(response["id"], "k");
    }

    #[test]
    fn test_v1_request_gets_v1_response() {
        let dispatcher = calculator();
        let response =
            dispatch_json(&dispatcher, r#"{"method": "echo", "params": ["hi"], "id": 9}"#).unwrap();
        assert_eq!(response, json!({"result": "hi", "id": 9}));
    }

    #[test]
    fn test_dispatcher_method_not_found() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, r#"{"method":"missing","id":1}"#).unwrap();
        assert_eq!(response["error"]["code"], -32601);
        assert_eq!(response["id"], 1);
    }

    #[test]
    fn test_invalid_params() {
        let dispatcher = calculator();
        for params in [r#"[1]"#, r#"[1, 2, 3]"#, r#"{"a": 1, "c": 2}"#, r#"["x", 2]"#] {
            let text = format!(r#"{{"jsonrpc": "2.0", "method": "add", "params": {}, "id": 1}}"#, params);
            let response = dispatch_json(&dispatcher, &text).unwrap();
            assert_eq!(response["error"]["code"], -32602, "params {}", params);
        }
    }

    #[test]
    fn test_absent_params_for_unit_method() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, r#"{"jsonrpc": "2.0", "method": "ping", "id": 1}"#).unwrap();
        assert_eq!(response["result"], "pong");
    }

    #[test]
    fn test_application_error_passes_through() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, r#"{"jsonrpc": "2.0", "method": "fail", "id": 2}"#).unwrap();
        assert_eq!(response["error"]["code"], 1001);
        assert_eq!(response["error"]["message"], "quota exceeded");
    }

    #[test]
    fn test_panic_becomes_internal_error() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, r#"{"jsonrpc": "2.0", "method": "boom", "id": 3}"#).unwrap();
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["data"], "kaboom");
    }

    #[test]
    fn test_anyhow_error_becomes_internal_error() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, r#"{"jsonrpc": "2.0", "method": "oops", "id": 3}"#).unwrap();
        assert_eq!(response["error"]["code"], -32603);
        assert_eq!(response["error"]["message"], "ledger unavailable");
    }

    #[test]
    fn test_notifications_are_never_answered() {
        let dispatcher = calculator();
        assert_eq!(dispatcher.dispatch(r#"{"jsonrpc": "2.0", "method": "boom"}"#), None);
        assert_eq!(dispatcher.dispatch(r#"{"method": "fail", "id": null}"#), None);
        assert_eq!(dispatcher.dispatch(r#"{"jsonrpc": "2.0", "method": "missing"}"#), None);
        assert_eq!(dispatcher.dispatch(r#"{"jsonrpc": "2.0", "method": "add", "params": 1}"#), None);
    }

    #[test]
    fn test_parse_error() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, r#"{"jsonrpc": "2.0", "method": "add", "#).unwrap();
        assert_eq!(response["error"]["code"], -32700);
        assert_eq!(response["id"], Value::Null);
    }

    #[test]
    fn test_empty_batch_is_invalid_request() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, "[]").unwrap();
        assert!(response.is_object());
        assert_eq!(response["error"]["code"], -32600);
    }

    #[test]
    fn test_mixed_batch() {
        let dispatcher = calculator();
        let response = dispatch_json(
            &dispatcher,
            r#"[
                {"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": "1"},
                {"jsonrpc": "2.0", "method": "echo", "params": ["x"]},
                {"jsonrpc": "2.0", "method": "missing", "id": "2"}
            ]"#,
        )
        .unwrap();

        let entries = response.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["result"], 3);
        assert_eq!(entries[1]["error"]["code"], -32601);
    }

    #[test]
    fn test_batch_with_invalid_entries() {
        let dispatcher = calculator();
        let response = dispatch_json(&dispatcher, "[1, 2]").unwrap();
        let entries = response.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        for entry in entries {
            assert_eq!(entry["error"]["code"], -32600);
            assert_eq!(entry["id"], Value::Null);
        }
    }

    #[test]
    fn test_single_entry_batch_stays_batch() {
        let dispatcher = calculator();
        let response =
            dispatch_json(&dispatcher, r#"[{"jsonrpc": "2.0", "method": "ping", "id": 1}]"#).unwrap();
        assert_eq!(response.as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_all_notification_batch_is_silent() {
        let dispatcher = calculator();
        let out = dispatcher.dispatch(
            r#"[{"jsonrpc": "2.0", "method": "ping"}, {"jsonrpc": "2.0", "method": "boom"}]"#,
        );
        assert_eq!(out, None);
    }

    #[test]
    fn test_batch_runs_in_input_order() {
        use std::sync::Mutex;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_typed("record", move |(n,): (i64,)| {
            recorder.lock().unwrap().push(n);
            Ok::<_, RpcError>(n)
        });

        dispatcher.dispatch(
            r#"[{"method": "record", "params": [1], "id": 1},
                {"method": "record", "params": [2]},
                {"method": "record", "params": [3], "id": 3}]"#,
        );
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_register_replaces_previous_handler() {
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_fn("version", |_| Ok(json!(1)));
        dispatcher.register_fn("version", |_| Ok(json!(2)));

        let response = dispatcher
            .handle_request(JsonRpcRequest::new_no_params(RequestId::Number(1), "version"))
            .unwrap();
        assert_eq!(response.result(), Some(&json!(2)));
        assert_eq!(dispatcher.registered_methods(), vec!["version".to_string()]);
    }

    #[test]
    fn test_register_methods_shares_handler() {
        struct Named;

        impl JsonRpcHandler for Named {
            fn handle(&self, method: &str, _params: Option<RequestParams>) -> Result<Value, RpcError> {
                Ok(json!(method))
            }
        }

        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_methods(vec!["a".to_string(), "b".to_string()], Named);

        let response = dispatcher
            .handle_request(
                JsonRpcRequest::new_no_params(RequestId::Number(1), "b").with_version(JsonRpcVersion::V1),
            )
            .unwrap();
        assert_eq!(response.result(), Some(&json!("b")));
        assert_eq!(response.version, JsonRpcVersion::V1);
    }
}
