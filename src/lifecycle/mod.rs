//! Lifecycle signalling.
//!
//! A [`LifecycleSource`] tells the engine when its host is about to go
//! away so buffered records can be flushed opportunistically. The binder
//! in [`binder`] only ever listens for [`LifecycleEvent::Hidden`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

pub mod binder;

pub use binder::LifecycleBinder;

/// Lifecycle transitions a source may report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The host is about to disappear or be hidden.
    Hidden,
    /// The host became visible again.
    Visible,
}

/// Listener invoked for a subscribed event.
pub type LifecycleListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

pub trait LifecycleSource: Send + Sync {
    fn subscribe(&self, event: LifecycleEvent, listener: LifecycleListener) -> SubscriptionId;

    /// Remove a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}

/// In-process [`LifecycleSource`] driven by its owner.
///
/// Call [`emit`](Self::emit) from a shutdown hook or signal handler to
/// notify subscribers.
#[derive(Default)]
pub struct LifecycleSignal {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<u64, (LifecycleEvent, LifecycleListener)>>,
}

impl LifecycleSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every listener subscribed to `event`.
    ///
    /// Listeners run after the registry lock is released, so they may
    /// subscribe or unsubscribe.
    pub fn emit(&self, event: LifecycleEvent) {
        let matching: Vec<LifecycleListener> = self
            .listeners
            .lock()
            .values()
            .filter(|(subscribed, _)| *subscribed == event)
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in matching {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl LifecycleSource for LifecycleSignal {
    fn subscribe(&self, event: LifecycleEvent, listener: LifecycleListener) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, (event, listener));
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().remove(&id.0);
    }
}

impl std::fmt::Debug for LifecycleSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleSignal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
