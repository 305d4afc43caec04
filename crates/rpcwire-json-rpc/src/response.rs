use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::error;

use crate::error::{JsonRpcErrorObject, RpcError};
use crate::types::{JsonRpcVersion, RequestId};

/// Outcome carried by a response: exactly one of `result` or `error`
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Result(Value),
    Error(JsonRpcErrorObject),
}

/// A JSON-RPC response
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub version: JsonRpcVersion,
    /// `None` when the request id could not be determined
    pub id: Option<RequestId>,
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2,
            id: Some(id),
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn error(id: Option<RequestId>, error: RpcError) -> Self {
        Self {
            version: JsonRpcVersion::V2,
            id,
            outcome: ResponseOutcome::Error(error.into()),
        }
    }

    pub fn with_version(mut self, version: JsonRpcVersion) -> Self {
        self.version = version;
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&JsonRpcErrorObject> {
        match &self.outcome {
            ResponseOutcome::Result(_) => None,
            ResponseOutcome::Error(error) => Some(error),
        }
    }

    /// Turn the response into the caller-facing value or typed error
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.outcome {
            ResponseOutcome::Result(value) => Ok(value),
            ResponseOutcome::Error(error) => Err(RpcError::from_object(error)),
        }
    }

    /// Validate one decoded response object
    pub fn from_value(value: Value) -> Result<Self, RpcError> {
        let Value::Object(mut object) = value else {
            return Err(RpcError::invalid_request("response must be a JSON object"));
        };

        let version = JsonRpcVersion::from_field(object.get("jsonrpc"))
            .ok_or_else(|| RpcError::invalid_request("unsupported jsonrpc version"))?;

        let id = match object.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(
                RequestId::from_value(&raw)
                    .ok_or_else(|| RpcError::invalid_request("id must be a string, an integer or null"))?,
            ),
        };

        let outcome = take_outcome(&mut object, version)?;
        Ok(Self { version, id, outcome })
    }
}

fn take_outcome(object: &mut Map<String, Value>, version: JsonRpcVersion) -> Result<ResponseOutcome, RpcError> {
    let error = match object.remove("error") {
        None | Some(Value::Null) => None,
        Some(error) => Some(error),
    };
    let mut result = object.remove("result");

    // 1.0 peers send `"result": null` next to a real error
    if version == JsonRpcVersion::V1 && error.is_some() && result == Some(Value::Null) {
        result = None;
    }

    match (result, error) {
        (Some(_), Some(_)) => Err(RpcError::invalid_request(
            "response carries both result and error",
        )),
        (None, None) => Err(RpcError::invalid_request(
            "response carries neither result nor error",
        )),
        (Some(result), None) => Ok(ResponseOutcome::Result(result)),
        (None, Some(error)) => serde_json::from_value(error)
            .map(ResponseOutcome::Error)
            .map_err(|e| RpcError::invalid_request(format!("malformed error object: {}", e))),
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        if let Some(version) = self.version.as_str() {
            map.serialize_entry("jsonrpc", version)?;
        }
        match &self.outcome {
            ResponseOutcome::Result(value) => map.serialize_entry("result", value)?,
            ResponseOutcome::Error(error) => map.serialize_entry("error", error)?,
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

/// A response body: one response or a batch of them.
///
/// Batch entries are in the order the peer sent them; correlate by id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseMessage {
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

impl ResponseMessage {
    pub fn into_responses(self) -> Vec<JsonRpcResponse> {
        match self {
            ResponseMessage::Single(response) => vec![response],
            ResponseMessage::Batch(responses) => responses,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, ResponseMessage::Batch(_))
    }

    /// Serialize for the wire. Falls back to a bare internal error object.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            error!("failed to serialize response: {}", e);
            format!(
                r#"{{"jsonrpc":"2.0","error":{{"code":{},"message":"Internal error"}},"id":null}}"#,
                crate::error_codes::INTERNAL_ERROR
            )
        })
    }
}

impl From<JsonRpcResponse> for ResponseMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Single(response)
    }
}

pub fn encode_success(id: RequestId, result: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(id, result)
}

pub fn encode_error(
    id: Option<RequestId>,
    code: i64,
    message: impl Into<String>,
    data: Option<Value>,
) -> JsonRpcResponse {
    JsonRpcResponse::error(id, RpcError::application(code, message, data))
}

/// Decode response text into a single response or a batch
pub fn decode(text: &str) -> Result<ResponseMessage, RpcError> {
    if text.trim().is_empty() {
        return Err(RpcError::parse_error("empty response body"));
    }

    let value: Value = serde_json::from_str(text).map_err(RpcError::parse_error)?;
    match value {
        Value::Array(entries) => entries
            .into_iter()
            .map(JsonRpcResponse::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map(ResponseMessage::Batch),
        other => JsonRpcResponse::from_value(other).map(ResponseMessage::Single),
    }
}
