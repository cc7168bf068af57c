//! Size-triggered eager sends.

use std::sync::Arc;

use log::{debug, warn};

use crate::config::Settings;
use crate::coordinator::SendCoordinator;
use crate::envelope::Envelope;
use crate::log_record::LogRecord;
use crate::queue::PersistentQueue;

/// Decides after each append whether the buffer is large enough to send.
///
/// The size measured is that of the envelope a real send would produce,
/// headers included.
pub struct AutoFlushPolicy {
    settings: Arc<Settings>,
}

impl AutoFlushPolicy {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Serialised envelope size for `records`, in bytes.
    pub fn envelope_size(&self, records: &[LogRecord]) -> Option<usize> {
        let envelope = Envelope::new(&self.settings.headers, &self.settings.data_key, records);
        match envelope.byte_len() {
            Ok(len) => Some(len),
            Err(err) => {
                warn!("BeaconBuffer failed to measure envelope: {err}");
                None
            }
        }
    }

    /// Whether `records` reach the configured threshold.
    pub fn exceeds_threshold(&self, records: &[LogRecord]) -> bool {
        self.envelope_size(records)
            .is_some_and(|size| size >= self.settings.max_buffer_size)
    }

    /// Send immediately if auto-send is on, the engine is running, no send
    /// is in flight, and the buffer has reached the threshold.
    ///
    /// Returns whether a send was triggered.
    pub fn check(&self, running: bool, queue: &PersistentQueue, coordinator: &SendCoordinator) -> bool {
        if !self.settings.enable_auto_send || !running || coordinator.is_sending() {
            return false;
        }
        let records = queue.read();
        if !self.exceeds_threshold(&records) {
            return false;
        }
        debug!(
            "BeaconBuffer buffer reached {} bytes; sending early",
            self.settings.max_buffer_size
        );
        coordinator.send_now();
        true
    }
}
