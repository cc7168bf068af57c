//! Thread-backed [`TimerService`].
//!
//! Each armed timer owns a thread blocked in `select!` on its schedule and
//! a cancellation channel. Cancelling drops the sender, which disconnects
//! the channel and lets the thread exit without being joined.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, after, bounded, select, tick};
use log::warn;
use parking_lot::Mutex;

use super::{TimerCallback, TimerHandle, TimerService};

type CancelMap = Arc<Mutex<HashMap<u64, Sender<()>>>>;

#[derive(Default)]
pub struct ThreadTimers {
    next_id: AtomicU64,
    active: CancelMap,
}

impl ThreadTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers armed and not yet fired or cancelled.
    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    fn arm(
        &self,
        schedule: Receiver<std::time::Instant>,
        repeat: bool,
        callback: TimerCallback,
    ) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        self.active.lock().insert(id, cancel_tx);

        let active = Arc::clone(&self.active);
        let spawned = thread::Builder::new()
            .name(format!("beacon-timer-{id}"))
            .spawn(move || run_timer(id, schedule, cancel_rx, repeat, callback, active));
        if let Err(err) = spawned {
            warn!("BeaconBuffer failed to spawn timer thread: {err}");
            self.active.lock().remove(&id);
        }
        TimerHandle(id)
    }
}

fn run_timer(
    id: u64,
    schedule: Receiver<std::time::Instant>,
    cancel: Receiver<()>,
    repeat: bool,
    callback: TimerCallback,
    active: CancelMap,
) {
    loop {
        select! {
            recv(cancel) -> _ => return,
            recv(schedule) -> _ => {
                // Both channels may be ready at once; cancellation wins.
                if matches!(cancel.try_recv(), Err(TryRecvError::Disconnected)) {
                    return;
                }
                if !repeat {
                    active.lock().remove(&id);
                }
                callback();
                if !repeat {
                    return;
                }
            }
        }
    }
}

impl TimerService for ThreadTimers {
    fn set_repeating(&self, period: Duration, callback: TimerCallback) -> TimerHandle {
        self.arm(tick(period), true, callback)
    }

    fn set_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        self.arm(after(delay), false, callback)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.active.lock().remove(&handle.0);
    }
}

impl Drop for ThreadTimers {
    fn drop(&mut self) {
        self.active.lock().clear();
    }
}

impl std::fmt::Debug for ThreadTimers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTimers")
            .field("active", &self.active_count())
            .finish()
    }
}
