//! Client-side log buffering with best-effort delivery.
//!
//! [`BeaconBuffer`] persists records through a [`Storage`] backend and
//! flushes them to a collector through a fire-and-forget [`Transport`]:
//! on demand, on a fixed interval, when the host signals it is about to
//! go away, and as soon as the buffered envelope grows past a size limit.
//! A send lock with a watchdog keeps at most one delivery in flight, and
//! successful sends drain only the records they carried.

pub mod auto_flush;
mod beacon;
pub mod config;
pub mod coordinator;
pub mod envelope;
pub mod lifecycle;
pub mod log_record;
pub mod queue;
pub mod rate_limited_warner;
pub mod storage;
pub mod timer;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_utils;

pub use auto_flush::AutoFlushPolicy;
pub use beacon::{BeaconBuffer, Collaborators};
pub use config::{BeaconConfig, ConfigError, Settings};
pub use coordinator::SendCoordinator;
pub use envelope::{CONTENT_TYPE, Envelope};
pub use lifecycle::{
    LifecycleBinder, LifecycleEvent, LifecycleListener, LifecycleSignal, LifecycleSource,
    SubscriptionId,
};
pub use log_record::{LogFields, LogRecord};
pub use queue::PersistentQueue;
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use timer::{ThreadTimers, TimerCallback, TimerHandle, TimerService};
pub use transport::{AuthConfig, HttpTransport, HttpTransportConfig, Transport};
