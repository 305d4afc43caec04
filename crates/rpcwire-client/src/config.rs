//! Configuration types for the HTTP client

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// URL of the JSON-RPC endpoint
    pub url: String,

    /// Basic authentication user; authentication is off without one
    #[serde(default)]
    pub username: Option<String>,

    /// Basic authentication password
    #[serde(default)]
    pub password: Option<String>,

    /// gzip request bodies and ask for gzipped responses
    #[serde(default)]
    pub gzip: bool,

    /// Whole-request timeout, none by default
    #[serde(default, with = "duration_serde::option")]
    pub timeout: Option<Duration>,

    /// Headers sent with every request. Applied last, so they override
    /// every header the client sets itself.
    #[serde(default)]
    pub additional_headers: BTreeMap<String, String>,

    /// Value of the `Content-Type` header
    #[serde(default = "default_content_type")]
    pub content_type: String,

    /// Cookies sent with every request as name/value pairs
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,

    /// Largest response body accepted after gzip decoding
    #[serde(default = "default_max_response_size")]
    pub max_response_size: usize,
}

fn default_content_type() -> String {
    "application/json".to_string()
}

fn default_max_response_size() -> usize {
    16 * 1024 * 1024
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            gzip: false,
            timeout: None,
            additional_headers: BTreeMap::new(),
            content_type: default_content_type(),
            cookies: BTreeMap::new(),
            max_response_size: default_max_response_size(),
        }
    }

    pub fn builder(url: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::new(url),
        }
    }
}

/// Builder for [`ClientConfig`]
#[derive(Debug, Clone)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self.config.password = Some(password.into());
        self
    }

    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.additional_headers.insert(name.into(), value.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.content_type = content_type.into();
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.cookies.insert(name.into(), value.into());
        self
    }

    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.config.max_response_size = bytes;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

// Durations travel as milliseconds
mod duration_serde {
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};
        use std::time::Duration;

        pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match duration {
                Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let millis = Option::<u64>::deserialize(deserializer)?;
            Ok(millis.map(Duration::from_millis))
        }
    }
}
