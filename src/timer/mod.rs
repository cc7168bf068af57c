//! Timer scheduling consumed by the engine.
//!
//! The engine arms a repeating timer for scheduled sends and one-shot
//! timers for the send watchdog. [`ThreadTimers`] runs them on background
//! threads; tests drive a virtual clock instead.

use std::sync::Arc;
use std::time::Duration;

mod thread;

pub use thread::ThreadTimers;

/// Callback invoked when a timer fires.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// Opaque identifier of an armed timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub(crate) u64);

impl TimerHandle {
    /// Build a handle from a raw id, for custom [`TimerService`] implementations.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn as_raw(self) -> u64 {
        self.0
    }
}

pub trait TimerService: Send + Sync {
    /// Invoke `callback` every `period` until cancelled.
    fn set_repeating(&self, period: Duration, callback: TimerCallback) -> TimerHandle;

    /// Invoke `callback` once after `delay` unless cancelled first.
    fn set_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a timer. Cancelling a fired or unknown timer is a no-op.
    fn cancel(&self, handle: TimerHandle);
}
