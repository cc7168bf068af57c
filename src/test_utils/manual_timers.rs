//! Virtual-clock [`TimerService`].

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::timer::{TimerCallback, TimerHandle, TimerService};

struct Entry {
    due: Duration,
    period: Option<Duration>,
    callback: TimerCallback,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<u64, Entry>,
}

/// Timers that only fire when [`advance`](Self::advance) moves virtual time.
///
/// Callbacks run on the caller's thread with no internal lock held, so they
/// may arm or cancel timers themselves.
#[derive(Default)]
pub struct ManualTimers {
    clock: Mutex<Clock>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of armed timers.
    pub fn pending(&self) -> usize {
        self.clock.lock().timers.len()
    }

    /// Move time forward by `by`, firing every timer that falls due in
    /// order of due time (ties in arming order).
    ///
    /// A callback may advance the clock itself; time never moves backwards.
    pub fn advance(&self, by: Duration) {
        let target = self.clock.lock().now + by;
        while let Some(callback) = self.pop_due(target) {
            callback();
        }
    }

    fn pop_due(&self, target: Duration) -> Option<TimerCallback> {
        let mut clock = self.clock.lock();
        let next = clock
            .timers
            .iter()
            .filter(|(_, entry)| entry.due <= target)
            .min_by_key(|(id, entry)| (entry.due, **id))
            .map(|(id, _)| *id);
        let Some(id) = next else {
            clock.now = clock.now.max(target);
            return None;
        };
        let entry = clock.timers.get_mut(&id)?;
        let due = entry.due;
        let callback = entry.callback.clone();
        let period = entry.period;
        match period {
            Some(period) => entry.due += period,
            None => {
                clock.timers.remove(&id);
            }
        }
        clock.now = clock.now.max(due);
        Some(callback)
    }

    fn arm(
        &self,
        delay: Duration,
        period: Option<Duration>,
        callback: TimerCallback,
    ) -> TimerHandle {
        let mut clock = self.clock.lock();
        let id = clock.next_id;
        clock.next_id += 1;
        let due = clock.now + delay;
        clock.timers.insert(
            id,
            Entry {
                due,
                period,
                callback,
            },
        );
        TimerHandle(id)
    }
}

impl TimerService for ManualTimers {
    fn set_repeating(&self, period: Duration, callback: TimerCallback) -> TimerHandle {
        let period = period.max(Duration::from_millis(1));
        self.arm(period, Some(period), callback)
    }

    fn set_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        self.arm(delay, None, callback)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.clock.lock().timers.remove(&handle.0);
    }
}
