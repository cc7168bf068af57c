//! Public facade composing the buffer, the coordinator, and the triggers.

use std::sync::Arc;

use crate::auto_flush::AutoFlushPolicy;
use crate::config::{BeaconConfig, ConfigError, Settings};
use crate::coordinator::SendCoordinator;
use crate::lifecycle::{LifecycleBinder, LifecycleSignal, LifecycleSource};
use crate::log_record::{LogFields, LogRecord};
use crate::queue::PersistentQueue;
use crate::storage::Storage;
use crate::timer::{ThreadTimers, TimerService};
use crate::transport::Transport;

/// External services the engine runs against.
#[derive(Clone)]
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub transport: Arc<dyn Transport>,
    pub lifecycle: Arc<dyn LifecycleSource>,
    pub timers: Arc<dyn TimerService>,
}

impl Collaborators {
    /// Use `storage` and `transport` with thread-backed timers and a fresh
    /// [`LifecycleSignal`].
    pub fn new(storage: Arc<dyn Storage>, transport: Arc<dyn Transport>) -> Self {
        Self {
            storage,
            transport,
            lifecycle: Arc::new(LifecycleSignal::new()),
            timers: Arc::new(ThreadTimers::new()),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<dyn LifecycleSource>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_timers(mut self, timers: Arc<dyn TimerService>) -> Self {
        self.timers = timers;
        self
    }
}

/// Buffers log records and ships them to a collector.
///
/// Records are persisted on every [`add_log`](Self::add_log) and sent
/// manually via [`send_now`](Self::send_now), on every send interval and
/// lifecycle `Hidden` signal once [`start`](Self::start)ed, and eagerly
/// when the buffered envelope reaches `max_buffer_size`.
///
/// None of the operations return errors: storage and transport failures
/// are logged and leave the buffer intact for a later attempt.
pub struct BeaconBuffer {
    settings: Arc<Settings>,
    queue: Arc<PersistentQueue>,
    coordinator: Arc<SendCoordinator>,
    auto_flush: AutoFlushPolicy,
    binder: LifecycleBinder,
}

impl BeaconBuffer {
    /// Resolve `config` and wire the engine. The engine starts stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint is missing or a setting is
    /// out of range.
    pub fn new(config: &BeaconConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        let settings = Arc::new(config.resolve()?);
        let queue = Arc::new(PersistentQueue::new(
            collaborators.storage,
            settings.buffer_key.clone(),
        ));
        let coordinator = Arc::new(SendCoordinator::new(
            Arc::clone(&settings),
            Arc::clone(&queue),
            collaborators.transport,
            Arc::clone(&collaborators.timers),
        ));
        let binder = LifecycleBinder::new(
            collaborators.lifecycle,
            collaborators.timers,
            settings.send_interval,
        );
        Ok(Self {
            auto_flush: AutoFlushPolicy::new(Arc::clone(&settings)),
            settings,
            queue,
            coordinator,
            binder,
        })
    }

    /// Timestamp and persist a record, sending early if the buffer is full.
    pub fn add_log(&self, fields: LogFields) {
        if self.queue.append(LogRecord::new(fields)) {
            self.auto_flush
                .check(self.binder.is_running(), &self.queue, &self.coordinator);
        }
    }

    /// Buffered records, oldest first.
    pub fn get_buffer(&self) -> Vec<LogRecord> {
        self.queue.read()
    }

    /// Drop every buffered record without sending it.
    pub fn clear_buffer(&self) {
        self.queue.clear();
    }

    /// Send the buffer now; see [`SendCoordinator::send_now`].
    pub fn send_now(&self) -> bool {
        self.coordinator.send_now()
    }

    /// Bind the interval timer and lifecycle signal, then send once.
    pub fn start(&self) {
        self.binder.start(&self.coordinator);
    }

    pub fn stop(&self) {
        self.binder.stop();
    }

    pub fn is_started(&self) -> bool {
        self.binder.is_running()
    }

    /// Whether a send currently holds the send lock.
    pub fn is_sending(&self) -> bool {
        self.coordinator.is_sending()
    }

    pub fn config(&self) -> &Settings {
        &self.settings
    }
}

impl Drop for BeaconBuffer {
    fn drop(&mut self) {
        if self.binder.is_running() {
            self.binder.stop();
        }
    }
}

impl std::fmt::Debug for BeaconBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeaconBuffer")
            .field("endpoint_url", &self.settings.endpoint_url)
            .field("started", &self.is_started())
            .field("sending", &self.is_sending())
            .finish()
    }
}
