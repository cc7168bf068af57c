//! Fixtures wiring a [`BeaconBuffer`] to in-memory storage, a recording
//! transport, virtual timers, and a manual lifecycle signal, so every
//! trigger can be driven deterministically from a test.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use beacon_buffer::test_utils::{ManualTimers, RecordingTransport};
use beacon_buffer::{
    BeaconBuffer, BeaconConfig, Collaborators, LifecycleSignal, LogFields, MemoryStorage,
};
use rstest::fixture;
use serde_json::Value;

pub const ENDPOINT: &str = "https://collector.test/ingest";

/// A running-capable engine plus handles on every collaborator.
pub struct Engine {
    pub beacon: Arc<BeaconBuffer>,
    pub storage: Arc<MemoryStorage>,
    pub transport: Arc<RecordingTransport>,
    pub timers: Arc<ManualTimers>,
    pub signal: Arc<LifecycleSignal>,
}

impl Engine {
    pub fn calls(&self) -> usize {
        self.transport.call_count()
    }
}

/// Build an engine from `config`, filling in the test endpoint.
pub fn engine_with(config: BeaconConfig) -> Engine {
    let storage = Arc::new(MemoryStorage::new());
    let transport = Arc::new(RecordingTransport::accepting());
    let timers = Arc::new(ManualTimers::new());
    let signal = Arc::new(LifecycleSignal::new());
    let collaborators = Collaborators::new(
        Arc::clone(&storage) as _,
        Arc::clone(&transport) as _,
    )
    .with_timers(Arc::clone(&timers) as _)
    .with_lifecycle(Arc::clone(&signal) as _);
    let beacon = BeaconBuffer::new(&config.with_endpoint(ENDPOINT), collaborators)
        .expect("valid test config");
    Engine {
        beacon: Arc::new(beacon),
        storage,
        transport,
        timers,
        signal,
    }
}

/// Engine with a 5 s interval and a 1 s send timeout.
#[fixture]
pub fn engine() -> Engine {
    engine_with(
        BeaconConfig::new()
            .with_send_interval(Duration::from_millis(5000))
            .with_send_timeout(Duration::from_millis(1000)),
    )
}

/// Convert a JSON object literal into record fields.
pub fn fields(value: Value) -> LogFields {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// A record whose envelope alone exceeds `bytes`.
pub fn big_fields(bytes: usize) -> LogFields {
    fields(serde_json::json!({ "blob": "x".repeat(bytes) }))
}
