//! Requests carried in a URL query string.
//!
//! GET requests and CGI requests without a body name the call with the
//! `method`, `params`, `id` and `jsonrpc` fields. `params` holds JSON: an
//! array becomes positional params, an object keyword params, and any other
//! JSON value is ignored.

use rpcwire_json_rpc::{
    IncomingRequest, JsonRpcDispatcher, JsonRpcRequest, JsonRpcVersion, RejectedRequest,
    RequestId, RequestParams, RpcError,
};
use serde_json::Value;
use url::form_urlencoded;

/// Why a query string could not be turned into a request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    /// No non-empty `method` field; not a JSON-RPC call at all
    #[error("query string has no method")]
    MissingMethod,

    /// A call was named but its fields are invalid
    #[error("{}", .0.error)]
    Rejected(RejectedRequest),
}

#[derive(Default)]
struct QueryFields {
    jsonrpc: Option<String>,
    id: Option<String>,
    method: Option<String>,
    params: Option<String>,
}

impl QueryFields {
    fn parse(query: &str) -> Self {
        let mut fields = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            // Blank values count as absent and the first occurrence wins
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "jsonrpc" => &mut fields.jsonrpc,
                "id" => &mut fields.id,
                "method" => &mut fields.method,
                "params" => &mut fields.params,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        fields
    }
}

/// Build a request from query string fields.
///
/// A missing `jsonrpc` field means a 1.0 request and a missing `id` makes
/// the request a notification.
pub fn request_from_query(query: &str) -> Result<JsonRpcRequest, QueryError> {
    let fields = QueryFields::parse(query);
    let method = fields.method.ok_or(QueryError::MissingMethod)?;
    let id = fields.id.map(RequestId::String);
    let reject = |version: JsonRpcVersion, notification: bool, error: RpcError| {
        QueryError::Rejected(RejectedRequest {
            id: id.clone(),
            version,
            notification,
            error,
        })
    };

    let version = JsonRpcVersion::from_field(fields.jsonrpc.map(Value::String).as_ref()).ok_or_else(
        || reject(JsonRpcVersion::V2, false, RpcError::invalid_request("unsupported jsonrpc version")),
    )?;

    let params = match fields.params {
        Some(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(value @ (Value::Array(_) | Value::Object(_))) => RequestParams::from_value(value),
            Ok(_) => None,
            Err(e) => return Err(reject(version, id.is_none(), RpcError::parse_error(e))),
        },
        None => None,
    };

    Ok(JsonRpcRequest {
        version,
        id,
        method,
        params: Some(params.unwrap_or(RequestParams::Array(vec![]))),
    })
}

/// Dispatch the call named by a query string.
///
/// Returns the serialized response, `None` for notifications, or
/// [`QueryError::MissingMethod`] when there is no call to make.
pub fn dispatch_query(dispatcher: &JsonRpcDispatcher, query: &str) -> Result<Option<String>, QueryError> {
    let entry = match request_from_query(query) {
        Ok(request) => Ok(request),
        Err(QueryError::Rejected(rejected)) => Err(rejected),
        Err(QueryError::MissingMethod) => return Err(QueryError::MissingMethod),
    };
    Ok(dispatcher
        .handle_message(IncomingRequest::Single(entry))
        .map(|message| message.to_json_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpcwire_json_rpc::JsonRpcErrorCode;
    use serde_json::json;

    #[test]
    fn test_positional_params() {
        let request =
            request_from_query("method=add&params=%5B1%2C2%5D&id=7&jsonrpc=2.0").unwrap();
        assert_eq!(request.method, "add");
        assert_eq!(request.version, JsonRpcVersion::V2);
        assert_eq!(request.id, Some(RequestId::String("7".to_string())));
        assert_eq!(
            request.params.map(RequestParams::into_value),
            Some(json!([1, 2]))
        );
    }

    #[test]
    fn test_keyword_params_and_defaults() {
        let request = request_from_query("method=greet&params={\"name\":\"ada\"}").unwrap();
        assert_eq!(request.version, JsonRpcVersion::V1);
        assert!(request.is_notification());
        assert_eq!(request.get_param("name"), Some(&json!("ada")));
    }

    #[test]
    fn test_scalar_params_are_ignored() {
        let request = request_from_query("method=ping&params=5&id=1").unwrap();
        assert_eq!(request.params.map(RequestParams::into_value), Some(json!([])));
    }

    #[test]
    fn test_missing_method() {
        assert_eq!(request_from_query("id=1"), Err(QueryError::MissingMethod));
        assert_eq!(request_from_query("method=&id=1"), Err(QueryError::MissingMethod));
        assert_eq!(request_from_query(""), Err(QueryError::MissingMethod));
    }

    #[test]
    fn test_malformed_params_keep_the_id() {
        let Err(QueryError::Rejected(rejected)) = request_from_query("method=add&params=%5B1&id=9") else {
            panic!("expected rejection");
        };
        assert_eq!(rejected.error.kind, JsonRpcErrorCode::ParseError);
        assert_eq!(rejected.id, Some(RequestId::String("9".to_string())));
        assert!(!rejected.notification);
    }

    #[test]
    fn test_unknown_version_is_invalid_request() {
        let Err(QueryError::Rejected(rejected)) = request_from_query("method=add&jsonrpc=3.0&id=1") else {
            panic!("expected rejection");
        };
        assert_eq!(rejected.error.kind, JsonRpcErrorCode::InvalidRequest);
    }

    #[test]
    fn test_dispatch_query() {
        let mut dispatcher = JsonRpcDispatcher::new();
        dispatcher.register_typed("add", |(a, b): (i64, i64)| Ok::<_, RpcError>(a + b));

        let response = dispatch_query(&dispatcher, "method=add&params=[2,3]&id=1&jsonrpc=2.0")
            .unwrap()
            .unwrap();
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value, json!({"jsonrpc": "2.0", "result": 5, "id": "1"}));

        // No id: a notification, nothing to send back
        assert_eq!(dispatch_query(&dispatcher, "method=add&params=[2,3]"), Ok(None));
        assert_eq!(dispatch_query(&dispatcher, "params=[2,3]"), Err(QueryError::MissingMethod));
    }
}
