//! Scripted [`Transport`] that records every call.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;

use crate::transport::Transport;

type Hook = Arc<dyn Fn() + Send + Sync>;

/// One captured `send_best_effort` call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub url: String,
    pub payload: String,
    pub content_type: String,
}

impl RecordedCall {
    /// The payload parsed as JSON.
    pub fn envelope(&self) -> Value {
        serde_json::from_str(&self.payload).unwrap_or(Value::Null)
    }

    /// Records carried under `data_key`.
    pub fn records(&self, data_key: &str) -> Vec<Value> {
        match self.envelope().get(data_key) {
            Some(Value::Array(records)) => records.clone(),
            _ => Vec::new(),
        }
    }
}

/// Transport returning scripted results.
///
/// Results are popped from a queue; once it is empty the default result is
/// returned. An optional hook runs *during* each call, which lets tests
/// append records mid-send, re-enter the engine, or advance virtual time
/// to simulate a stalled delivery.
pub struct RecordingTransport {
    script: Mutex<VecDeque<bool>>,
    default: AtomicBool,
    calls: Mutex<Vec<RecordedCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    hook: Mutex<Option<Hook>>,
}

impl RecordingTransport {
    /// A transport accepting every payload.
    pub fn accepting() -> Self {
        Self::with_default(true)
    }

    /// A transport refusing every payload.
    pub fn rejecting() -> Self {
        Self::with_default(false)
    }

    fn with_default(result: bool) -> Self {
        Self {
            script: Mutex::default(),
            default: AtomicBool::new(result),
            calls: Mutex::default(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            hook: Mutex::default(),
        }
    }

    /// Queue results for the next calls, ahead of the default.
    pub fn script(&self, results: impl IntoIterator<Item = bool>) {
        self.script.lock().extend(results);
    }

    pub fn set_default(&self, result: bool) {
        self.default.store(result, Ordering::SeqCst);
    }

    /// Run `hook` inside every subsequent call.
    pub fn set_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(hook));
    }

    pub fn clear_hook(&self) {
        *self.hook.lock() = None;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Highest number of calls observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Transport for RecordingTransport {
    fn send_best_effort(&self, url: &str, payload: &str, content_type: &str) -> bool {
        self.calls.lock().push(RecordedCall {
            url: url.to_owned(),
            payload: payload.to_owned(),
            content_type: content_type.to_owned(),
        });
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let scripted = self.script.lock().pop_front();
        scripted.unwrap_or_else(|| self.default.load(Ordering::SeqCst))
    }
}
