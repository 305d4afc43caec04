//! HTTP transport implementation

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use reqwest::header::{
    ACCEPT_ENCODING, AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName,
    HeaderValue,
};
use tracing::{debug, warn};
use rpcwire_json_rpc::compression::{gunzip, gzip};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, TransportError};
use crate::transport::{Transport, TransportStatistics};

/// HTTP POST transport
#[derive(Debug)]
pub struct HttpTransport {
    /// HTTP client
    client: Client,
    /// Server endpoint URL
    endpoint: Url,
    /// Headers sent with every request
    headers: HeaderMap,
    /// gzip request bodies
    gzip: bool,
    /// Cap on a decompressed response body
    max_response_size: usize,
    /// Statistics
    stats: Arc<parking_lot::Mutex<TransportStatistics>>,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("rpcwire-client/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Self::with_client(config, client)
    }

    /// Create HTTP transport with custom client
    pub fn with_client(config: &ClientConfig, client: Client) -> ClientResult<Self> {
        let endpoint = parse_endpoint(&config.url)?;
        Ok(Self {
            client,
            endpoint,
            headers: build_headers(config)?,
            gzip: config.gzip,
            max_response_size: config.max_response_size,
            stats: Arc::new(parking_lot::Mutex::new(TransportStatistics::default())),
        })
    }

    /// Update statistics
    fn update_stats<F>(&self, update_fn: F)
    where
        F: FnOnce(&mut TransportStatistics),
    {
        let mut stats = self.stats.lock();
        update_fn(&mut stats);
    }

    fn record_error(&self, error: &TransportError) {
        self.update_stats(|stats| {
            stats.errors += 1;
            stats.last_error = Some(error.to_string());
        });
    }

    async fn exchange(&self, body: String) -> Result<String, TransportError> {
        let payload = if self.gzip {
            gzip(body.as_bytes())?
        } else {
            body.into_bytes()
        };

        debug!(endpoint = %self.endpoint, bytes = payload.len(), "Sending HTTP request");
        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .body(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else if e.is_connect() {
                    TransportError::ConnectionFailed(e.to_string())
                } else {
                    TransportError::Http(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        let gzipped = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.trim().eq_ignore_ascii_case("gzip"));
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Http(format!("Failed to read response body: {}", e))
            }
        })?;

        decode_body(status.as_u16(), gzipped, &bytes, self.max_response_size)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, body: String) -> ClientResult<String> {
        self.update_stats(|stats| stats.requests_sent += 1);
        match self.exchange(body).await {
            Ok(text) => {
                self.update_stats(|stats| stats.responses_received += 1);
                Ok(text)
            }
            Err(error) => {
                warn!(endpoint = %self.endpoint, "HTTP request failed: {}", error);
                self.record_error(&error);
                Err(error.into())
            }
        }
    }

    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    fn statistics(&self) -> TransportStatistics {
        self.stats.lock().clone()
    }
}

/// Turn a reply into text. A failed status wins over any body decoding error.
fn decode_body(status: u16, gzipped: bool, bytes: &[u8], limit: usize) -> Result<String, TransportError> {
    if !(200..300).contains(&status) {
        let decoded = if gzipped { gunzip(bytes, limit).ok() } else { None };
        return Err(TransportError::Status {
            status,
            body: String::from_utf8_lossy(decoded.as_deref().unwrap_or(bytes)).into_owned(),
        });
    }

    let bytes = if gzipped && !bytes.is_empty() {
        gunzip(bytes, limit)?
    } else {
        bytes.to_vec()
    };

    String::from_utf8(bytes)
        .map_err(|e| TransportError::Http(format!("Response body is not valid UTF-8: {}", e)))
}

fn parse_endpoint(url: &str) -> ClientResult<Url> {
    let url = Url::parse(url).map_err(|e| ClientError::config(format!("Invalid URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::config(format!(
            "Invalid scheme for HTTP transport: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Headers for every request. Additional headers go last and win.
fn build_headers(config: &ClientConfig) -> ClientResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, header_value(&config.content_type)?);

    if config.gzip {
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    }

    if let Some(username) = &config.username {
        let password = config.password.as_deref().unwrap_or("");
        let credentials = BASE64.encode(format!("{}:{}", username, password));
        let mut value = header_value(&format!("Basic {}", credentials))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    if !config.cookies.is_empty() {
        let cookie = config
            .cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");
        headers.insert(COOKIE, header_value(&cookie)?);
    }

    for (name, value) in &config.additional_headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ClientError::config(format!("Invalid header name '{}': {}", name, e)))?;
        headers.insert(name, header_value(value)?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> ClientResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::config(format!("Invalid header value '{}': {}", value, e)))
}
