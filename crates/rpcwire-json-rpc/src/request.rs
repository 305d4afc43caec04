use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::RpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// Parameters for a JSON-RPC request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(Map<String, Value>),
}

impl RequestParams {
    /// Build params from positional and keyword arguments.
    ///
    /// The two are mutually exclusive. With neither, an empty positional
    /// list is produced so 1.0 peers always see a `params` member.
    pub fn from_args(positional: Vec<Value>, keyword: Map<String, Value>) -> Result<Self, RpcError> {
        match (positional.is_empty(), keyword.is_empty()) {
            (false, false) => Err(RpcError::invalid_params(
                "positional and keyword arguments are mutually exclusive",
            )),
            (true, false) => Ok(RequestParams::Object(keyword)),
            _ => Ok(RequestParams::Array(positional)),
        }
    }

    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params only)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map.clone()),
            RequestParams::Array(arr) => Value::Array(arr.clone()),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            RequestParams::Object(map) => Value::Object(map),
            RequestParams::Array(arr) => Value::Array(arr),
        }
    }

    /// Accept an array or object, `None` for anything else
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Array(arr) => Some(RequestParams::Array(arr)),
            Value::Object(map) => Some(RequestParams::Object(map)),
            _ => None,
        }
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(map: Map<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

/// A JSON-RPC request. `id == None` makes it a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub method: String,
    pub params: Option<RequestParams>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2,
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    /// Create a notification (no id, never answered)
    pub fn notification(method: impl Into<String>, params: Option<RequestParams>) -> Self {
        Self {
            version: JsonRpcVersion::V2,
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Create a new request with no parameters
    pub fn new_no_params(id: RequestId, method: impl Into<String>) -> Self {
        Self::new(id, method, None)
    }

    /// Create a new request with object parameters
    pub fn new_with_object_params(
        id: RequestId,
        method: impl Into<String>,
        params: Map<String, Value>,
    ) -> Self {
        Self::new(id, method, Some(RequestParams::Object(params)))
    }

    /// Create a new request with array parameters
    pub fn new_with_array_params(id: RequestId, method: impl Into<String>, params: Vec<Value>) -> Self {
        Self::new(id, method, Some(RequestParams::Array(params)))
    }

    pub fn with_version(mut self, version: JsonRpcVersion) -> Self {
        self.version = version;
        self
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Get a parameter by name (if params are an object)
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are an array)
    pub fn get_param_index(&self, index: usize) -> Option<&Value> {
        self.params.as_ref()?.get_index(index)
    }

    /// Validate one decoded request object
    pub fn from_value(value: Value) -> Result<Self, RejectedRequest> {
        let Value::Object(mut object) = value else {
            return Err(RejectedRequest::unanswerable(RpcError::invalid_request(
                "request must be a JSON object",
            )));
        };

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => match RequestId::from_value(&raw) {
                Some(id) => Some(id),
                None => {
                    return Err(RejectedRequest::unanswerable(RpcError::invalid_request(
                        "id must be a string, an integer or null",
                    )));
                }
            },
        };

        let Some(version) = JsonRpcVersion::from_field(object.get("jsonrpc")) else {
            return Err(RejectedRequest {
                id,
                version: JsonRpcVersion::V2,
                notification: false,
                error: RpcError::invalid_request("unsupported jsonrpc version"),
            });
        };

        // A request only counts as a notification once its method is known
        let method = match object.remove("method") {
            Some(Value::String(method)) => method,
            _ => {
                return Err(RejectedRequest {
                    id,
                    version,
                    notification: false,
                    error: RpcError::invalid_request("method must be a string"),
                });
            }
        };

        let params = match object.remove("params") {
            None | Some(Value::Null) => None,
            Some(raw) => match RequestParams::from_value(raw) {
                Some(params) => Some(params),
                None => {
                    return Err(RejectedRequest {
                        notification: id.is_none(),
                        id,
                        version,
                        error: RpcError::invalid_request("params must be an array or an object"),
                    });
                }
            },
        };

        Ok(Self {
            version,
            id,
            method,
            params,
        })
    }
}

impl Serialize for JsonRpcRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(version) = self.version.as_str() {
            map.serialize_entry("jsonrpc", version)?;
        }
        map.serialize_entry("method", &self.method)?;
        if let Some(params) = &self.params {
            map.serialize_entry("params", params)?;
        }
        // Notifications carry an explicit null id in both versions
        match &self.id {
            Some(id) => map.serialize_entry("id", id)?,
            None => map.serialize_entry("id", &Value::Null)?,
        }
        map.end()
    }
}

/// A request object that failed validation
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRequest {
    /// Id to answer with, when one could be read
    pub id: Option<RequestId>,
    pub version: JsonRpcVersion,
    /// Notifications are rejected silently
    pub notification: bool,
    pub error: RpcError,
}

impl RejectedRequest {
    fn unanswerable(error: RpcError) -> Self {
        Self {
            id: None,
            version: JsonRpcVersion::V2,
            notification: false,
            error,
        }
    }
}

/// A decoded request body: one request or a batch
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingRequest {
    Single(Result<JsonRpcRequest, RejectedRequest>),
    Batch(Vec<Result<JsonRpcRequest, RejectedRequest>>),
}

/// Decode request text.
///
/// Malformed or empty text is a parse error and an empty batch is an invalid
/// request. Entries that are valid JSON but not valid requests are reported
/// per entry so the rest of a batch can still be served.
pub fn decode(text: &str) -> Result<IncomingRequest, RpcError> {
    if text.trim().is_empty() {
        return Err(RpcError::parse_error("empty request body"));
    }

    let value: Value = serde_json::from_str(text).map_err(RpcError::parse_error)?;
    match value {
        Value::Array(entries) if entries.is_empty() => {
            Err(RpcError::invalid_request("batch must not be empty"))
        }
        Value::Array(entries) => Ok(IncomingRequest::Batch(
            entries.into_iter().map(JsonRpcRequest::from_value).collect(),
        )),
        other => Ok(IncomingRequest::Single(JsonRpcRequest::from_value(other))),
    }
}

/// Build a request with a fresh random id
pub fn encode(
    method: impl Into<String>,
    positional: Vec<Value>,
    keyword: Map<String, Value>,
) -> Result<JsonRpcRequest, RpcError> {
    let params = RequestParams::from_args(positional, keyword)?;
    Ok(JsonRpcRequest::new(RequestId::generate(), method, Some(params)))
}

/// Build a notification (id null)
pub fn encode_notification(
    method: impl Into<String>,
    positional: Vec<Value>,
    keyword: Map<String, Value>,
) -> Result<JsonRpcRequest, RpcError> {
    let params = RequestParams::from_args(positional, keyword)?;
    Ok(JsonRpcRequest::notification(method, Some(params)))
}

/// One call inside a batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallSpec {
    pub method: String,
    pub positional: Vec<Value>,
    pub keyword: Map<String, Value>,
    pub notification: bool,
}

impl CallSpec {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn args(mut self, values: Vec<Value>) -> Self {
        self.positional = values;
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(name.into(), value.into());
        self
    }

    pub fn kwargs(mut self, values: Map<String, Value>) -> Self {
        self.keyword = values;
        self
    }

    pub fn as_notification(mut self) -> Self {
        self.notification = true;
        self
    }

    pub fn into_request(self) -> Result<JsonRpcRequest, RpcError> {
        if self.notification {
            encode_notification(self.method, self.positional, self.keyword)
        } else {
            encode(self.method, self.positional, self.keyword)
        }
    }
}

/// Build a batch. Every entry is validated and an empty batch is refused.
pub fn encode_batch(calls: Vec<CallSpec>) -> Result<Vec<JsonRpcRequest>, RpcError> {
    if calls.is_empty() {
        return Err(RpcError::invalid_request("batch must not be empty"));
    }
    calls.into_iter().map(CallSpec::into_request).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JsonRpcErrorCode;
    use serde_json::{json, to_value};

    fn kwargs(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn single(text: &str) -> Result<JsonRpcRequest, RejectedRequest> {
        match decode(text).unwrap() {
            IncomingRequest::Single(request) => request,
            IncomingRequest::Batch(_) => panic!("expected single request"),
        }
    }

    #[test]
    fn test_keyword_round_trip() {
        let keyword = kwargs(json!({"name": "test", "value": 42, "nested": {"a": [1, 2]}}));
        let request = encode("set_value", vec![], keyword.clone()).unwrap();
        let text = serde_json::to_string(&request).unwrap();

        let parsed = single(&text).unwrap();
        assert_eq!(parsed.method, "set_value");
        assert_eq!(parsed.params, Some(RequestParams::Object(keyword)));
        assert_eq!(parsed.id, request.id);
        assert_eq!(parsed.version, JsonRpcVersion::V2);
    }

    #[test]
    fn test_positional_and_keyword_are_exclusive() {
        let err = encode("add", vec![json!(1)], kwargs(json!({"b": 2}))).unwrap_err();
        assert_eq!(err.kind, JsonRpcErrorCode::InvalidParams);
    }

    #[test]
    fn test_no_args_encode_empty_array() {
        let request = encode("ping", vec![], Map::new()).unwrap();
        assert_eq!(request.params, Some(RequestParams::Array(vec![])));
        assert!(matches!(request.id, Some(RequestId::String(_))));
    }

    #[test]
    fn test_notification_json_format() {
        let notification = encode_notification("log", vec![json!("hello")], Map::new()).unwrap();
        let value = to_value(&notification).unwrap();
        assert_eq!(
            value,
            json!({"jsonrpc": "2.0", "method": "log", "params": ["hello"], "id": null})
        );
        let text = serde_json::to_string(&notification).unwrap();
        assert!(text.contains(r#""id":null"#));

        let v1 = notification.with_version(JsonRpcVersion::V1);
        let value = to_value(&v1).unwrap();
        assert_eq!(value, json!({"method": "log", "params": ["hello"], "id": null}));
    }

    #[test]
    fn test_encode_batch() {
        let batch = encode_batch(vec![
            CallSpec::new("add").arg(1).arg(2),
            CallSpec::new("greet").kwarg("name", "Ada"),
            CallSpec::new("log").arg("x").as_notification(),
        ])
        .unwrap();

        assert_eq!(batch.len(), 3);
        assert!(batch[0].id.is_some());
        assert_ne!(batch[0].id, batch[1].id);
        assert!(batch[2].is_notification());
    }

    #[test]
    fn test_encode_batch_rejects_empty_and_invalid_entries() {
        let err = encode_batch(vec![]).unwrap_err();
        assert_eq!(err.kind, JsonRpcErrorCode::InvalidRequest);

        let err = encode_batch(vec![CallSpec::new("add").arg(1).kwarg("b", 2)]).unwrap_err();
        assert_eq!(err.kind, JsonRpcErrorCode::InvalidParams);
    }

    #[test]
    fn test_decode_distinguishes_forms() {
        assert!(matches!(
            decode(r#"{"method": "a", "id": 1}"#),
            Ok(IncomingRequest::Single(Ok(_)))
        ));
        match decode(r#"[{"method": "a", "id": 1}, {"method": "b"}]"#).unwrap() {
            IncomingRequest::Batch(entries) => {
                assert_eq!(entries.len(), 2);
                assert!(entries[1].as_ref().unwrap().is_notification());
            }
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_malformed_is_parse_error() {
        for text in ["", "   ", r#"{"method": "a", "id""#, "not json"] {
            let err = decode(text).unwrap_err();
            assert_eq!(err.code(), -32700, "input {:?}", text);
        }
    }

    #[test]
    fn test_decode_empty_batch_is_invalid_request() {
        let err = decode("[]").unwrap_err();
        assert_eq!(err.kind, JsonRpcErrorCode::InvalidRequest);
    }

    #[test]
    fn test_v1_request_without_jsonrpc() {
        let request = single(r#"{"method": "echo", "params": ["x"], "id": "abc"}"#).unwrap();
        assert_eq!(request.version, JsonRpcVersion::V1);
        assert_eq!(request.id, Some(RequestId::String("abc".to_string())));
        assert_eq!(request.get_param_index(0), Some(&json!("x")));
    }

    #[test]
    fn test_invalid_request_shapes() {
        let rejected = single("42").unwrap_err();
        assert_eq!(rejected.id, None);
        assert!(!rejected.notification);

        let rejected = single(r#"{"jsonrpc": "2.0", "method": 1, "params": "bar"}"#).unwrap_err();
        assert!(!rejected.notification);
        assert_eq!(rejected.error.kind, JsonRpcErrorCode::InvalidRequest);

        let rejected = single(r#"{"jsonrpc": "2.0", "method": "m", "params": "bar", "id": 3}"#)
            .unwrap_err();
        assert_eq!(rejected.id, Some(RequestId::Number(3)));

        let rejected = single(r#"{"jsonrpc": "2.0", "method": "m", "params": 5}"#).unwrap_err();
        assert!(rejected.notification);

        let rejected = single(r#"{"jsonrpc": "9.9", "method": "m", "id": 1}"#).unwrap_err();
        assert_eq!(rejected.id, Some(RequestId::Number(1)));

        let rejected = single(r#"{"method": "m", "id": 1.5}"#).unwrap_err();
        assert_eq!(rejected.id, None);
    }

    #[test]
    fn test_request_with_array_params() {
        let request = JsonRpcRequest::new_with_array_params(
            RequestId::Number(2),
            "process",
            vec![json!("test"), json!(42), json!(true)],
        );

        assert_eq!(request.get_param_index(0), Some(&json!("test")));
        assert_eq!(request.get_param_index(2), Some(&json!(true)));
        assert_eq!(request.get_param_index(3), None);
        assert_eq!(request.get_param("test"), None);
    }
}
