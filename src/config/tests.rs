//! Tests for configuration resolution and loading.

use std::io::Write;
use std::time::Duration;

use rstest::rstest;
use serde_json::json;
use tempfile::NamedTempFile;

use super::*;

fn minimal() -> BeaconConfig {
    BeaconConfig::new().with_endpoint("https://collector.test/ingest")
}

#[test]
fn resolve_applies_defaults() {
    let settings = minimal().resolve().expect("valid config");
    assert_eq!(settings.endpoint_url, "https://collector.test/ingest");
    assert_eq!(settings.send_interval, DEFAULT_SEND_INTERVAL);
    assert_eq!(settings.send_timeout, DEFAULT_SEND_TIMEOUT);
    assert_eq!(settings.max_buffer_size, DEFAULT_MAX_BUFFER_SIZE);
    assert_eq!(settings.buffer_key, "beaconBuffer");
    assert_eq!(settings.data_key, "logs");
    assert!(settings.enable_send_lock);
    assert!(!settings.retry_on_failure);
    assert!(settings.enable_auto_send);
    assert!(settings.headers.is_empty());
}

#[rstest]
#[case::absent(BeaconConfig::new())]
#[case::empty(BeaconConfig::new().with_endpoint(""))]
#[case::blank(BeaconConfig::new().with_endpoint("   "))]
fn resolve_requires_endpoint(#[case] config: BeaconConfig) {
    assert!(matches!(config.resolve(), Err(ConfigError::MissingEndpoint)));
}

#[rstest]
#[case::interval(minimal().with_send_interval(Duration::ZERO), "sendInterval")]
#[case::timeout(minimal().with_send_timeout(Duration::ZERO), "sendTimeout")]
#[case::size(minimal().with_max_buffer_size(0), "maxBufferSize")]
#[case::buffer_key(minimal().with_buffer_key(" "), "bufferKey")]
#[case::data_key(minimal().with_data_key(""), "dataKey")]
fn resolve_rejects_invalid_values(#[case] config: BeaconConfig, #[case] field: &str) {
    match config.resolve() {
        Err(ConfigError::InvalidValue(msg)) => assert!(msg.contains(field), "{msg}"),
        other => panic!("expected InvalidValue for {field}, got {other:?}"),
    }
}

#[test]
fn builder_overrides_are_kept() {
    let settings = minimal()
        .with_send_interval(Duration::from_millis(5000))
        .with_send_timeout(Duration::from_millis(250))
        .with_header("app", "shop")
        .with_header("version", 3)
        .with_send_lock(false)
        .with_retry_on_failure(true)
        .with_max_buffer_size(1000)
        .with_auto_send(false)
        .resolve()
        .expect("valid config");
    assert_eq!(settings.send_interval, Duration::from_millis(5000));
    assert_eq!(settings.send_timeout, Duration::from_millis(250));
    assert_eq!(settings.headers.get("app"), Some(&json!("shop")));
    assert_eq!(settings.headers.get("version"), Some(&json!(3)));
    assert!(!settings.enable_send_lock);
    assert!(settings.retry_on_failure);
    assert_eq!(settings.max_buffer_size, 1000);
    assert!(!settings.enable_auto_send);
}

#[test]
fn json_uses_camel_case_keys() {
    let config = BeaconConfig::from_json_str(
        r#"{"endpointUrl": "https://c.test", "sendInterval": 1500, "headers": {"k": "v"}, "retryOnFailure": true}"#,
    )
    .expect("parse");
    let settings = config.resolve().expect("resolve");
    assert_eq!(settings.send_interval, Duration::from_millis(1500));
    assert!(settings.retry_on_failure);
    assert_eq!(settings.headers.get("k"), Some(&json!("v")));
}

#[test]
fn serialised_settings_load_back_as_config() {
    let settings = minimal()
        .with_send_interval(Duration::from_millis(2500))
        .with_send_timeout(Duration::from_secs(4))
        .with_header("app", "shop")
        .with_retry_on_failure(true)
        .resolve()
        .expect("resolve");

    let value = serde_json::to_value(&settings).expect("serialise");
    assert_eq!(value["sendInterval"], json!(2500));
    assert_eq!(value["sendTimeout"], json!(4000));

    let reloaded = BeaconConfig::from_json_str(&value.to_string())
        .expect("parse")
        .resolve()
        .expect("resolve");
    assert_eq!(reloaded, settings);
}

#[test]
fn json_parse_errors_are_load_errors() {
    assert!(matches!(
        BeaconConfig::from_json_str("{not json"),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn ini_sections_populate_config() {
    let config = BeaconConfig::from_ini_str(
        "[beacon]\n\
         endpoint_url = https://c.test/in\n\
         send_interval_ms = 5000\n\
         send_timeout_ms = 800\n\
         max_buffer_size = 2048\n\
         enable_send_lock = no\n\
         retry_on_failure = true\n\
         enable_auto_send = off\n\
         data_key = events\n\
         [beacon.headers]\n\
         app = checkout\n",
    )
    .expect("parse");
    let settings = config.resolve().expect("resolve");
    assert_eq!(settings.endpoint_url, "https://c.test/in");
    assert_eq!(settings.send_interval, Duration::from_millis(5000));
    assert_eq!(settings.send_timeout, Duration::from_millis(800));
    assert_eq!(settings.max_buffer_size, 2048);
    assert!(!settings.enable_send_lock);
    assert!(settings.retry_on_failure);
    assert!(!settings.enable_auto_send);
    assert_eq!(settings.data_key, "events");
    assert_eq!(settings.headers.get("app"), Some(&json!("checkout")));
}

#[rstest]
#[case::missing_section("[other]\nendpoint_url = x\n")]
#[case::unknown_key("[beacon]\nendpoint = x\n")]
#[case::bad_integer("[beacon]\nsend_interval_ms = soon\n")]
#[case::bad_bool("[beacon]\nretry_on_failure = maybe\n")]
fn ini_rejects_malformed_input(#[case] text: &str) {
    assert!(matches!(
        BeaconConfig::from_ini_str(text),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn ini_file_loading_reports_missing_and_empty_files() {
    let missing = BeaconConfig::from_ini_file("/nonexistent/beacon.ini");
    assert!(matches!(missing, Err(ConfigError::Load(msg)) if msg.contains("doesn't exist")));

    let empty = NamedTempFile::new().expect("tempfile");
    let result = BeaconConfig::from_ini_file(empty.path());
    assert!(matches!(result, Err(ConfigError::Load(msg)) if msg.contains("empty")));
}

#[test]
fn ini_file_loading_reads_contents() {
    let mut file = NamedTempFile::new().expect("tempfile");
    writeln!(file, "[beacon]\nendpoint_url = https://c.test").expect("write");
    let config = BeaconConfig::from_ini_file(file.path()).expect("load");
    assert_eq!(config.endpoint_url.as_deref(), Some("https://c.test"));
}
