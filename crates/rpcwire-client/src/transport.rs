//! Transport layer for the client

use async_trait::async_trait;

use crate::error::ClientResult;

pub mod http;

pub use http::HttpTransport;

/// Moves request text to a server and brings the response text back
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request body. An empty string means the server sent no
    /// response body, as it does for notifications.
    async fn send(&self, body: String) -> ClientResult<String>;

    /// Where requests go
    fn endpoint(&self) -> &str;

    /// Get transport statistics
    fn statistics(&self) -> TransportStatistics {
        TransportStatistics::default()
    }
}

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn Transport>;

/// Transport statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportStatistics {
    /// Number of requests sent
    pub requests_sent: u64,
    /// Number of response bodies received
    pub responses_received: u64,
    /// Number of errors encountered
    pub errors: u64,
    /// Last error message
    pub last_error: Option<String>,
}
