//! Configuration for the beacon buffer.
//!
//! [`BeaconConfig`] is the raw, all-optional form callers build with
//! `with_*` methods, deserialise from JSON, or load from an INI file.
//! [`BeaconConfig::resolve`] validates it and fills in defaults, producing
//! the immutable [`Settings`] snapshot the engine runs on.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

mod ini_file;

#[cfg(test)]
mod tests;

/// Default period between scheduled sends.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(20);
/// Default time a locked send may stay in flight before the watchdog fires.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);
/// Default envelope size (bytes) that triggers an eager send.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 64 * 1024;
/// Default storage key holding the persisted buffer.
pub const DEFAULT_BUFFER_KEY: &str = "beaconBuffer";
/// Default envelope key holding the record array.
pub const DEFAULT_DATA_KEY: &str = "logs";

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No collector endpoint was supplied.
    #[error("endpointUrl is required")]
    MissingEndpoint,
    /// A supplied value is out of range.
    #[error("invalid beacon configuration: {0}")]
    InvalidValue(String),
    /// The configuration file could not be read or parsed.
    #[error("failed to load beacon configuration: {0}")]
    Load(String),
}

/// Raw configuration; every field is optional until resolved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeaconConfig {
    pub endpoint_url: Option<String>,
    /// Milliseconds between scheduled sends.
    pub send_interval: Option<u64>,
    /// Static fields spread into every envelope.
    pub headers: Option<Map<String, Value>>,
    pub buffer_key: Option<String>,
    pub data_key: Option<String>,
    pub enable_send_lock: Option<bool>,
    /// Milliseconds before a stuck send lock is force-released.
    pub send_timeout: Option<u64>,
    pub retry_on_failure: Option<bool>,
    /// Envelope size in bytes that triggers an eager send.
    pub max_buffer_size: Option<usize>,
    pub enable_auto_send: Option<bool>,
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(ConfigError::InvalidValue(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

impl BeaconConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collector URL (required).
    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Set the scheduled send period.
    pub fn with_send_interval(mut self, interval: Duration) -> Self {
        self.send_interval = Some(duration_ms(interval));
        self
    }

    /// Set the watchdog timeout for a locked send.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(duration_ms(timeout));
        self
    }

    /// Add a single static envelope field.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace all static envelope fields.
    pub fn with_headers(mut self, headers: Map<String, Value>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Set the storage key holding the buffer.
    pub fn with_buffer_key(mut self, key: impl Into<String>) -> Self {
        self.buffer_key = Some(key.into());
        self
    }

    /// Set the envelope key holding the record array.
    pub fn with_data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    option_setter!(
        #[doc = "Enable or disable the single in-flight send lock."]
        with_send_lock,
        enable_send_lock,
        bool
    );
    option_setter!(
        #[doc = "Retry a rejected send once before giving up."]
        with_retry_on_failure,
        retry_on_failure,
        bool
    );
    option_setter!(
        #[doc = "Set the envelope size in bytes that triggers an eager send."]
        with_max_buffer_size,
        max_buffer_size,
        usize
    );
    option_setter!(
        #[doc = "Enable or disable size-triggered eager sends."]
        with_auto_send,
        enable_auto_send,
        bool
    );

    /// Parse a JSON document using the camelCase keys.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Load(err.to_string()))
    }

    /// Validate the configuration and apply defaults.
    ///
    /// # Errors
    ///
    /// * [`ConfigError::MissingEndpoint`] when the endpoint is absent or blank.
    /// * [`ConfigError::InvalidValue`] when a duration, size, or key is empty.
    pub fn resolve(&self) -> Result<Settings, ConfigError> {
        let endpoint_url = match self.endpoint_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_owned(),
            _ => return Err(ConfigError::MissingEndpoint),
        };
        let send_interval = ensure_positive!(
            self.send_interval
                .unwrap_or_else(|| duration_ms(DEFAULT_SEND_INTERVAL)),
            "sendInterval"
        )?;
        let send_timeout = ensure_positive!(
            self.send_timeout
                .unwrap_or_else(|| duration_ms(DEFAULT_SEND_TIMEOUT)),
            "sendTimeout"
        )?;
        let max_buffer_size = ensure_positive!(
            self.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER_SIZE),
            "maxBufferSize"
        )?;

        Ok(Settings {
            endpoint_url,
            send_interval: Duration::from_millis(send_interval),
            headers: self.headers.clone().unwrap_or_default(),
            buffer_key: non_blank(self.buffer_key.as_deref(), DEFAULT_BUFFER_KEY, "bufferKey")?,
            data_key: non_blank(self.data_key.as_deref(), DEFAULT_DATA_KEY, "dataKey")?,
            enable_send_lock: self.enable_send_lock.unwrap_or(true),
            send_timeout: Duration::from_millis(send_timeout),
            retry_on_failure: self.retry_on_failure.unwrap_or(false),
            max_buffer_size,
            enable_auto_send: self.enable_auto_send.unwrap_or(true),
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}

fn serialize_millis<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration_ms(*duration))
}

fn non_blank(value: Option<&str>, default: &str, field: &str) -> Result<String, ConfigError> {
    match value {
        None => Ok(default.to_owned()),
        Some(v) if v.trim().is_empty() => Err(ConfigError::InvalidValue(format!(
            "{field} must not be empty"
        ))),
        Some(v) => Ok(v.to_owned()),
    }
}

/// Immutable, validated settings.
///
/// Serialises with the same camelCase keys and millisecond durations that
/// [`BeaconConfig`] reads, so a snapshot can be loaded back as config.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub endpoint_url: String,
    #[serde(serialize_with = "serialize_millis")]
    pub send_interval: Duration,
    pub headers: Map<String, Value>,
    pub buffer_key: String,
    pub data_key: String,
    pub enable_send_lock: bool,
    #[serde(serialize_with = "serialize_millis")]
    pub send_timeout: Duration,
    pub retry_on_failure: bool,
    pub max_buffer_size: usize,
    pub enable_auto_send: bool,
}
