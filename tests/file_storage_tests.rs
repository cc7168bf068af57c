//! Records persisted through `FileStorage` survive an engine restart.

use std::sync::Arc;

use beacon_buffer::test_utils::{ManualTimers, RecordingTransport};
use beacon_buffer::{BeaconBuffer, BeaconConfig, Collaborators, FileStorage, LifecycleSignal};
use serde_json::json;
use tempfile::tempdir;

mod test_utils;
use test_utils::fields;
use test_utils::fixtures::ENDPOINT;

fn beacon_on(dir: &std::path::Path, transport: Arc<RecordingTransport>) -> BeaconBuffer {
    let storage = Arc::new(FileStorage::open(dir).expect("open storage"));
    let collaborators = Collaborators::new(storage, transport)
        .with_timers(Arc::new(ManualTimers::new()))
        .with_lifecycle(Arc::new(LifecycleSignal::new()));
    BeaconBuffer::new(&BeaconConfig::new().with_endpoint(ENDPOINT), collaborators)
        .expect("valid config")
}

#[test]
fn buffered_records_reload_after_restart() {
    let dir = tempdir().expect("tempdir");
    let first = beacon_on(dir.path(), Arc::new(RecordingTransport::rejecting()));
    first.add_log(fields(json!({"a": 1})));
    first.add_log(fields(json!({"a": 2})));
    assert!(!first.send_now());
    drop(first);

    let transport = Arc::new(RecordingTransport::accepting());
    let second = beacon_on(dir.path(), Arc::clone(&transport));
    assert_eq!(second.get_buffer().len(), 2);

    assert!(second.send_now());
    assert!(second.get_buffer().is_empty());
    let sent: Vec<_> = transport.calls()[0]
        .records("logs")
        .iter()
        .map(|r| r["a"].clone())
        .collect();
    assert_eq!(sent, vec![json!(1), json!(2)]);
}

#[test]
fn separate_buffer_keys_do_not_share_records() {
    let dir = tempdir().expect("tempdir");
    let storage = Arc::new(FileStorage::open(dir.path()).expect("open storage"));
    let build = |key: &str| {
        let collaborators = Collaborators::new(
            Arc::clone(&storage) as _,
            Arc::new(RecordingTransport::accepting()),
        )
        .with_timers(Arc::new(ManualTimers::new()));
        BeaconBuffer::new(
            &BeaconConfig::new().with_endpoint(ENDPOINT).with_buffer_key(key),
            collaborators,
        )
        .expect("valid config")
    };
    let left = build("left");
    let right = build("right");

    left.add_log(fields(json!({"side": "left"})));
    assert_eq!(left.get_buffer().len(), 1);
    assert!(right.get_buffer().is_empty());
}
