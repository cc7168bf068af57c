//! Send coordination: the lock, the watchdog, and snapshot-then-drain.
//!
//! A send reads the buffer, hands an envelope of those records to the
//! transport, and on acceptance removes exactly that many records from the
//! head of the *current* buffer. Records appended while the transport call
//! was running sit behind the snapshot and survive the drain.
//!
//! With the send lock enabled at most one attempt is in flight. Each locked
//! attempt gets a fresh generation and a one-shot watchdog; if the
//! watchdog fires first it resets the lock without draining, and the late
//! attempt, now stale, leaves the buffer alone when it returns.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::config::Settings;
use crate::envelope::{CONTENT_TYPE, Envelope};
use crate::queue::PersistentQueue;
use crate::timer::{TimerCallback, TimerService};
use crate::transport::Transport;

mod state;


use state::SendState;

/// Result of a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    /// The transport accepted the envelope.
    Sent,
    /// Nothing was sent: the lock was held or the buffer was empty.
    Skipped,
    /// The transport refused the envelope.
    Rejected,
}

pub struct SendCoordinator {
    settings: Arc<Settings>,
    queue: Arc<PersistentQueue>,
    transport: Arc<dyn Transport>,
    timers: Arc<dyn TimerService>,
    state: Arc<Mutex<SendState>>,
    next_generation: AtomicU64,
}

impl SendCoordinator {
    pub fn new(
        settings: Arc<Settings>,
        queue: Arc<PersistentQueue>,
        transport: Arc<dyn Transport>,
        timers: Arc<dyn TimerService>,
    ) -> Self {
        Self {
            settings,
            queue,
            transport,
            timers,
            state: Arc::new(Mutex::new(SendState::Idle)),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Whether a locked send currently owns the lock.
    pub fn is_sending(&self) -> bool {
        self.state.lock().is_sending()
    }

    /// Snapshot size of the in-flight send, if any.
    pub fn in_flight(&self) -> Option<usize> {
        self.state.lock().snapshot_len()
    }

    /// Send the buffered records now.
    ///
    /// Returns `true` when the transport accepted an envelope. A rejected
    /// envelope is retried once when `retry_on_failure` is set; the retry
    /// re-reads the buffer and re-checks the lock like a fresh call.
    ///
    /// `true` does not imply the records were drained: an accepted send
    /// that completes after its watchdog released the lock leaves them
    /// buffered for a later send.
    pub fn send_now(&self) -> bool {
        let attempts = if self.settings.retry_on_failure { 2 } else { 1 };
        for attempt in 1..=attempts {
            match self.attempt() {
                Attempt::Sent => return true,
                Attempt::Skipped => return false,
                Attempt::Rejected if attempt < attempts => {
                    debug!("BeaconBuffer retrying rejected send");
                }
                Attempt::Rejected => {}
            }
        }
        false
    }

    fn attempt(&self) -> Attempt {
        let lease;
        let snapshot = if self.settings.enable_send_lock {
            let mut state = self.state.lock();
            if state.is_sending() {
                debug!("BeaconBuffer send already in flight; skipping");
                return Attempt::Skipped;
            }
            let snapshot = self.queue.read();
            if snapshot.is_empty() {
                return Attempt::Skipped;
            }
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            *state = SendState::Sending {
                generation,
                snapshot_len: snapshot.len(),
                watchdog: None,
            };
            drop(state);
            lease = Some(self.acquire(generation));
            snapshot
        } else {
            lease = None;
            let snapshot = self.queue.read();
            if snapshot.is_empty() {
                return Attempt::Skipped;
            }
            snapshot
        };

        let envelope = Envelope::new(&self.settings.headers, &self.settings.data_key, &snapshot);
        let payload = match envelope.to_json() {
            Ok(payload) => payload,
            Err(err) => {
                warn!("BeaconBuffer failed to serialise envelope: {err}");
                return Attempt::Skipped;
            }
        };

        if !self
            .transport
            .send_best_effort(&self.settings.endpoint_url, &payload, CONTENT_TYPE)
        {
            warn!(
                "BeaconBuffer transport rejected {} records for {}",
                snapshot.len(),
                self.settings.endpoint_url
            );
            return Attempt::Rejected;
        }

        let count = snapshot.len();
        match lease {
            Some(lease) => {
                let drained = lease.finish(|| self.queue.drain_by_count(count));
                if !drained {
                    warn!(
                        "BeaconBuffer send completed after its lock timed out; keeping {count} records"
                    );
                }
            }
            None => self.queue.drain_by_count(count),
        }
        debug!("BeaconBuffer sent {count} records");
        Attempt::Sent
    }

    /// Arm the watchdog for `generation` and wrap it in a lease.
    fn acquire(&self, generation: u64) -> SendLease<'_> {
        let timeout = self.settings.send_timeout;
        let state = Arc::downgrade(&self.state);
        let handle = self
            .timers
            .set_once(timeout, watchdog_callback(state, generation, timeout));

        let stored = match &mut *self.state.lock() {
            SendState::Sending {
                generation: owner,
                watchdog,
                ..
            } if *owner == generation => {
                *watchdog = Some(handle);
                true
            }
            _ => false,
        };
        if !stored {
            // Already timed out.
            self.timers.cancel(handle);
        }

        SendLease {
            state: &self.state,
            timers: self.timers.as_ref(),
            generation,
        }
    }
}

fn watchdog_callback(
    state: Weak<Mutex<SendState>>,
    generation: u64,
    timeout: std::time::Duration,
) -> TimerCallback {
    Arc::new(move || {
        let Some(state) = state.upgrade() else {
            return;
        };
        if state.lock().release(generation).is_some() {
            warn!("BeaconBuffer send timed out after {timeout:?}; releasing send lock");
        }
    })
}

/// Ownership of the send lock for one attempt.
///
/// Dropping the lease releases the lock and disarms the watchdog if this
/// attempt still owns them, so an early return or a panicking transport
/// cannot leave the lock stuck.
struct SendLease<'a> {
    state: &'a Mutex<SendState>,
    timers: &'a dyn TimerService,
    generation: u64,
}

impl SendLease<'_> {
    /// Run `on_owned` and release, but only if the lock is still ours.
    ///
    /// Returns `false` when the watchdog already released the lock.
    fn finish(self, on_owned: impl FnOnce()) -> bool {
        let mut state = self.state.lock();
        if state.generation() != Some(self.generation) {
            return false;
        }
        on_owned();
        let watchdog = state.release(self.generation).flatten();
        drop(state);
        if let Some(handle) = watchdog {
            self.timers.cancel(handle);
        }
        true
    }
}

impl Drop for SendLease<'_> {
    fn drop(&mut self) {
        let released = self.state.lock().release(self.generation);
        if let Some(Some(handle)) = released {
            self.timers.cancel(handle);
        }
    }
}
