//! Rate-limited warning mechanism for failed deliveries.
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

/// Default minimum interval between aggregated warnings.
pub const DEFAULT_WARN_INTERVAL: Duration = Duration::from_secs(5);

const NEVER: u64 = u64::MAX;

/// Helper that rate limits repeated failure warnings.
///
/// The caller increments the failure counter via [`record_failure`]. The
/// next call to [`warn_if_due`] emits a warning using the provided callback
/// if the configured interval has elapsed. [`flush`] emits a warning
/// immediately if any failures have been recorded since the last emission.
///
/// [`record_failure`]: Self::record_failure
/// [`warn_if_due`]: Self::warn_if_due
/// [`flush`]: Self::flush
pub struct RateLimitedWarner {
    origin: Instant,
    interval_ms: u64,
    last_warn_ms: AtomicU64,
    failures: AtomicU64,
}

impl RateLimitedWarner {
    /// Create a warner whose first warning can be emitted immediately.
    pub fn new(interval: Duration) -> Self {
        Self {
            origin: Instant::now(),
            interval_ms: interval.as_millis().min(u128::from(u64::MAX)) as u64,
            last_warn_ms: AtomicU64::new(NEVER),
            failures: AtomicU64::new(0),
        }
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit a warning if the rate limit interval has elapsed.
    pub fn warn_if_due(&self, warn: impl FnOnce(u64)) {
        self.warn_at(self.elapsed_ms(), warn);
    }

    /// Immediately warn about any pending failures.
    pub fn flush(&self, warn: impl FnOnce(u64)) {
        let count = self.failures.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn_ms.store(self.elapsed_ms(), Ordering::Relaxed);
        }
    }

    fn warn_at(&self, now_ms: u64, warn: impl FnOnce(u64)) {
        let prev = self.last_warn_ms.load(Ordering::Relaxed);
        if prev != NEVER && now_ms.saturating_sub(prev) < self.interval_ms {
            return;
        }
        let count = self.failures.swap(0, Ordering::Relaxed);
        if count > 0 {
            warn(count);
            self.last_warn_ms.store(now_ms, Ordering::Relaxed);
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis().min(u128::from(u64::MAX - 1)) as u64
    }
}

impl Default for RateLimitedWarner {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_INTERVAL)
    }
}
