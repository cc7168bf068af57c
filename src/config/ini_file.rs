//! INI loading for [`BeaconConfig`].
//!
//! ```ini
//! [beacon]
//! endpoint_url = https://collector.example/ingest
//! send_interval_ms = 5000
//! retry_on_failure = true
//!
//! [beacon.headers]
//! app = checkout
//! ```
//!
//! Header values are kept as JSON strings.

use std::{fs, io::ErrorKind, path::Path, str::FromStr};

use ini::Ini;
use serde_json::{Map, Value};

use super::{BeaconConfig, ConfigError};

const SECTION: &str = "beacon";
const HEADERS_SECTION: &str = "beacon.headers";

impl BeaconConfig {
    /// Load configuration from an INI file.
    pub fn from_ini_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::Load(format!(
                    "{} doesn't exist",
                    path.display()
                )));
            }
            Err(err) => {
                return Err(ConfigError::Load(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };
        if text.trim().is_empty() {
            return Err(ConfigError::Load(format!("{} is an empty file", path.display())));
        }
        Self::from_ini_str(&text)
    }

    /// Parse configuration from INI text.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|err| ConfigError::Load(err.to_string()))?;
        let section = ini
            .section(Some(SECTION))
            .ok_or_else(|| ConfigError::Load(format!("missing [{SECTION}] section")))?;

        let mut config = BeaconConfig::default();
        for (key, value) in section.iter() {
            let value = value.trim();
            match key {
                "endpoint_url" => config.endpoint_url = Some(value.to_owned()),
                "send_interval_ms" => config.send_interval = Some(parse(key, value)?),
                "send_timeout_ms" => config.send_timeout = Some(parse(key, value)?),
                "max_buffer_size" => config.max_buffer_size = Some(parse(key, value)?),
                "buffer_key" => config.buffer_key = Some(value.to_owned()),
                "data_key" => config.data_key = Some(value.to_owned()),
                "enable_send_lock" => config.enable_send_lock = Some(parse_bool(key, value)?),
                "retry_on_failure" => config.retry_on_failure = Some(parse_bool(key, value)?),
                "enable_auto_send" => config.enable_auto_send = Some(parse_bool(key, value)?),
                other => {
                    return Err(ConfigError::Load(format!(
                        "unknown key '{other}' in [{SECTION}]"
                    )));
                }
            }
        }

        if let Some(headers) = ini.section(Some(HEADERS_SECTION)) {
            let map: Map<String, Value> = headers
                .iter()
                .map(|(k, v)| (k.to_owned(), Value::String(v.to_owned())))
                .collect();
            config.headers = Some(map);
        }
        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Load(format!("{key} must be a non-negative integer, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::Load(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}
