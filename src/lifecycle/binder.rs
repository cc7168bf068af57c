//! Binds the coordinator to its automatic triggers.
//!
//! While running, a repeating timer and the lifecycle `Hidden` signal both
//! call [`SendCoordinator::send_now`], the same entry point manual callers
//! use, so automatic sends respect the send lock.

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::warn;
use parking_lot::Mutex;

use crate::coordinator::SendCoordinator;
use crate::timer::{TimerCallback, TimerHandle, TimerService};

use super::{LifecycleEvent, LifecycleSource, SubscriptionId};

struct Bindings {
    subscription: SubscriptionId,
    ticker: TimerHandle,
}

pub struct LifecycleBinder {
    lifecycle: Arc<dyn LifecycleSource>,
    timers: Arc<dyn TimerService>,
    interval: Duration,
    bindings: Mutex<Option<Bindings>>,
}

impl LifecycleBinder {
    pub fn new(
        lifecycle: Arc<dyn LifecycleSource>,
        timers: Arc<dyn TimerService>,
        interval: Duration,
    ) -> Self {
        Self {
            lifecycle,
            timers,
            interval,
            bindings: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.bindings.lock().is_some()
    }

    /// Subscribe the triggers and send once immediately.
    ///
    /// Returns `false` (with a warning) when already running.
    pub fn start(&self, coordinator: &Arc<SendCoordinator>) -> bool {
        {
            let mut bindings = self.bindings.lock();
            if bindings.is_some() {
                warn!("BeaconBuffer already started");
                return false;
            }
            let subscription = self
                .lifecycle
                .subscribe(LifecycleEvent::Hidden, trigger(coordinator));
            let ticker = self
                .timers
                .set_repeating(self.interval, trigger(coordinator));
            *bindings = Some(Bindings {
                subscription,
                ticker,
            });
        }
        coordinator.send_now();
        true
    }

    /// Unsubscribe the triggers.
    ///
    /// Returns `false` (with a warning) when already stopped.
    pub fn stop(&self) -> bool {
        let Some(bindings) = self.bindings.lock().take() else {
            warn!("BeaconBuffer already stopped");
            return false;
        };
        self.lifecycle.unsubscribe(bindings.subscription);
        self.timers.cancel(bindings.ticker);
        true
    }
}

fn trigger(coordinator: &Arc<SendCoordinator>) -> TimerCallback {
    let coordinator: Weak<SendCoordinator> = Arc::downgrade(coordinator);
    Arc::new(move || {
        if let Some(coordinator) = coordinator.upgrade() {
            coordinator.send_now();
        }
    })
}
