use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC request identifier
///
/// Only strings and integers are accepted on the wire. A missing or `null`
/// id is modelled as `Option::<RequestId>::None` by the request and
/// response types, never as a variant here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl RequestId {
    /// Generate a random string id for an outgoing call
    pub fn generate() -> Self {
        RequestId::String(uuid::Uuid::new_v4().to_string())
    }

    /// Read an id from a JSON value, rejecting floats, booleans and containers
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => n.as_i64().map(RequestId::Number),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RequestId::String(s) => Value::String(s.clone()),
            RequestId::Number(n) => Value::from(*n),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId::String(s)
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n)
    }
}

/// Protocol dialect of a message.
///
/// 1.0 messages carry no `jsonrpc` member; 2.0 messages carry `"jsonrpc": "2.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonRpcVersion {
    V1,
    #[default]
    V2,
}

impl JsonRpcVersion {
    /// Value of the `jsonrpc` member, `None` for 1.0
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            JsonRpcVersion::V1 => None,
            JsonRpcVersion::V2 => Some(crate::JSONRPC_VERSION),
        }
    }

    /// Interpret the `jsonrpc` member of an incoming object.
    ///
    /// Absent, `null` and `"1.0"` mean 1.0. Anything other than `"2.0"` is
    /// rejected with `None`.
    pub fn from_field(field: Option<&Value>) -> Option<Self> {
        match field {
            None | Some(Value::Null) => Some(JsonRpcVersion::V1),
            Some(Value::String(s)) if s == crate::JSONRPC_VERSION => Some(JsonRpcVersion::V2),
            Some(Value::String(s)) if s == "1.0" => Some(JsonRpcVersion::V1),
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcVersion::V1 => write!(f, "1.0"),
            JsonRpcVersion::V2 => write!(f, "2.0"),
        }
    }
}
