//! HTTP request handler for JSON-RPC

use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{
    ALLOW, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue, PRAGMA,
};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use tracing::{debug, error, warn};

use rpcwire_json_rpc::{JsonRpcDispatcher, JsonRpcResponse, ResponseMessage, RpcError};

use crate::compression::{GunzipError, accepts_gzip, gunzip, gzip, is_gzipped};
use crate::query::dispatch_query;
use crate::{CorsLayer, ServerConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP handler for JSON-RPC requests.
///
/// Dispatch is synchronous, so every call runs on tokio's blocking pool and
/// never stalls the connection tasks.
#[derive(Clone)]
pub struct RpcHttpHandler {
    config: Arc<ServerConfig>,
    dispatcher: Arc<JsonRpcDispatcher>,
}

impl RpcHttpHandler {
    pub fn new(config: Arc<ServerConfig>, dispatcher: Arc<JsonRpcDispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<JsonRpcDispatcher> {
        &self.dispatcher
    }

    /// Route a request by path and method
    pub async fn handle_request<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        debug!("Handling {} {}", req.method(), req.uri().path());

        let mut response = if !self.config.serves_path(req.uri().path()) {
            plain_response(StatusCode::NOT_FOUND, "Not Found")
        } else {
            match *req.method() {
                Method::POST => self.handle_post(req).await,
                Method::GET => self.handle_get(req.headers(), req.uri().query()).await,
                Method::OPTIONS => preflight(),
                _ => method_not_allowed(),
            }
        };

        if self.config.enable_cors {
            match &self.config.cors_origin {
                Some(origin) => CorsLayer::apply_cors_headers_for_origin(response.headers_mut(), origin),
                None => CorsLayer::apply_cors_headers(response.headers_mut()),
            }
        }
        response
    }

    /// Handle JSON-RPC requests over HTTP POST
    async fn handle_post<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        let max_body_size = self.config.max_body_size;

        let declared_length = parts
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        if declared_length.is_some_and(|length| length > max_body_size) {
            warn!("Request body too large: {:?} bytes", declared_length);
            return plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }

        let mut body_bytes = match Limited::new(body, max_body_size).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!("Request body exceeds {} bytes", max_body_size);
                return plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return plain_response(StatusCode::BAD_REQUEST, "Failed to read request body");
            }
        };

        if is_gzipped(&parts.headers) {
            body_bytes = match gunzip(&body_bytes, max_body_size) {
                Ok(decoded) => Bytes::from(decoded),
                Err(GunzipError::TooLarge { limit }) => {
                    warn!("Decompressed request body exceeds {} bytes", limit);
                    return plain_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
                }
                Err(err) => {
                    warn!("Invalid gzip request body: {}", err);
                    return plain_response(StatusCode::BAD_REQUEST, "Invalid gzip request body");
                }
            };
        }

        let text = match String::from_utf8(body_bytes.to_vec()) {
            Ok(text) => text,
            Err(err) => {
                warn!("Invalid UTF-8 in request body: {}", err);
                let reply = ResponseMessage::from(JsonRpcResponse::error(
                    None,
                    RpcError::parse_error("request body is not valid UTF-8"),
                ));
                return self.rpc_response(&parts.headers, Some(reply.to_json_string()));
            }
        };

        debug!("Received JSON-RPC request: {}", text);
        match self.dispatch_blocking(move |dispatcher| dispatcher.dispatch(&text)).await {
            Ok(reply) => self.rpc_response(&parts.headers, reply),
            Err(response) => response,
        }
    }

    /// Handle JSON-RPC requests carried in the GET query string
    async fn handle_get(&self, headers: &HeaderMap, query: Option<&str>) -> Response<Full<Bytes>> {
        let Some(query) = query.filter(|query| !query.is_empty()) else {
            return plain_response(StatusCode::BAD_REQUEST, "Missing query string");
        };

        let query = query.to_owned();
        match self.dispatch_blocking(move |dispatcher| dispatch_query(dispatcher, &query)).await {
            Ok(Ok(reply)) => self.rpc_response(headers, reply),
            Ok(Err(err)) => {
                debug!("Rejecting GET request: {}", err);
                plain_response(StatusCode::BAD_REQUEST, "Missing method")
            }
            Err(response) => response,
        }
    }

    /// Run dispatcher work on the blocking pool
    async fn dispatch_blocking<T, F>(&self, work: F) -> Result<T, Response<Full<Bytes>>>
    where
        F: FnOnce(&JsonRpcDispatcher) -> T + Send + 'static,
        T: Send + 'static,
    {
        let dispatcher = Arc::clone(&self.dispatcher);
        tokio::task::spawn_blocking(move || work(&dispatcher))
            .await
            .map_err(|err| {
                error!("Dispatch task failed: {}", err);
                plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            })
    }

    /// Wrap dispatcher output. `None` means the request needs no answer.
    fn rpc_response(&self, request_headers: &HeaderMap, reply: Option<String>) -> Response<Full<Bytes>> {
        let Some(reply) = reply else {
            debug!("Notification handled, no response body");
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::NO_CONTENT;
            set_no_cache(response.headers_mut());
            return response;
        };

        let mut body = Bytes::from(reply);
        let mut compressed = false;
        if self.config.gzip_responses && accepts_gzip(request_headers) {
            match gzip(&body) {
                Ok(encoded) => {
                    body = Bytes::from(encoded);
                    compressed = true;
                }
                Err(err) => warn!("Failed to gzip response, sending it plain: {}", err),
            }
        }

        let length = body.len();
        let mut response = Response::new(Full::new(body));
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        set_no_cache(headers);
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
        if compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }
        response
    }
}

fn set_no_cache(headers: &mut HeaderMap) {
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// Handle OPTIONS preflight requests
fn preflight() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, POST, OPTIONS"));
    response
}

fn method_not_allowed() -> Response<Full<Bytes>> {
    let mut response = plain_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, POST, OPTIONS"));
    response
}
