//! Configuration structures consumed by the HTTP transport.

use std::collections::HashMap;
use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

/// Default bounded channel capacity for pending payloads.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default write/request timeout applied to HTTP requests.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Authentication attached to every request.
#[derive(Clone, Debug, Default)]
pub enum AuthConfig {
    /// No authentication.
    #[default]
    None,
    /// HTTP Basic authentication with username and password.
    Basic { username: String, password: String },
    /// Bearer token authentication.
    Bearer { token: String },
}

/// Configuration object describing how to construct an
/// [`HttpTransport`](super::HttpTransport).
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Payloads that may wait for the worker before new ones are refused.
    pub capacity: usize,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Timeout for sending a request.
    pub write_timeout: Duration,
    pub auth: AuthConfig,
    /// Extra HTTP request headers. Distinct from envelope headers, which
    /// travel inside the JSON body.
    pub request_headers: HashMap<String, String>,
    /// Interval between aggregated delivery-failure warnings.
    pub warn_interval: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            auth: AuthConfig::default(),
            request_headers: HashMap::new(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl HttpTransportConfig {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, write: Duration) -> Self {
        self.connect_timeout = connect;
        self.write_timeout = write;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_request_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(key.into(), value.into());
        self
    }
}
