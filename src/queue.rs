//! Persistent FIFO of log records over a [`Storage`] backend.
//!
//! The whole buffer lives as one JSON array under a single key. Every
//! read-modify-write goes through `rmw`, so appends and drains issued from
//! timer threads cannot interleave and lose records.

use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;

use crate::log_record::LogRecord;
use crate::storage::{Storage, StorageError};

pub struct PersistentQueue {
    storage: Arc<dyn Storage>,
    key: String,
    rmw: Mutex<()>,
}

impl PersistentQueue {
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
            rmw: Mutex::new(()),
        }
    }

    /// Append `record` at the tail.
    ///
    /// Returns `false` when the buffer could not be read or written; the
    /// failure is logged, the record is dropped, and the stored buffer is
    /// left as it was.
    pub fn append(&self, record: LogRecord) -> bool {
        let _guard = self.rmw.lock();
        let Some(mut records) = self.load_for_write("append") else {
            return false;
        };
        records.push(record);
        self.store(&records)
    }

    /// Current buffer contents, oldest first.
    ///
    /// Missing or corrupt data, or a failed read, yields an empty buffer.
    pub fn read(&self) -> Vec<LogRecord> {
        let _guard = self.rmw.lock();
        self.load().unwrap_or_else(|err| {
            warn!("BeaconBuffer failed to read buffer '{}': {err}", self.key);
            Vec::new()
        })
    }

    /// Remove the storage key.
    pub fn clear(&self) {
        let _guard = self.rmw.lock();
        self.remove_key();
    }

    /// Remove the first `count` records of the current buffer.
    ///
    /// Positions, not identities, are removed: records appended since the
    /// caller's snapshot sit behind them and survive. When the buffer cannot
    /// be read nothing is removed.
    pub fn drain_by_count(&self, count: usize) {
        if count == 0 {
            return;
        }
        let _guard = self.rmw.lock();
        let Some(mut records) = self.load_for_write("drain") else {
            return;
        };
        if count >= records.len() {
            self.remove_key();
            return;
        }
        records.drain(..count);
        self.store(&records);
    }

    /// Stored records; missing or corrupt data reads as empty.
    ///
    /// Only a storage failure is an error, so writers never replace records
    /// they could not see.
    fn load(&self) -> Result<Vec<LogRecord>, StorageError> {
        let Some(raw) = self.storage.get(&self.key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!("BeaconBuffer ignoring corrupt buffer '{}': {err}", self.key);
                Ok(Vec::new())
            }
        }
    }

    fn load_for_write(&self, op: &str) -> Option<Vec<LogRecord>> {
        match self.load() {
            Ok(records) => Some(records),
            Err(err) => {
                warn!(
                    "BeaconBuffer failed to read buffer '{}'; skipping {op}: {err}",
                    self.key
                );
                None
            }
        }
    }

    fn store(&self, records: &[LogRecord]) -> bool {
        let json = match serde_json::to_string(records) {
            Ok(json) => json,
            Err(err) => {
                warn!("BeaconBuffer failed to serialise buffer: {err}");
                return false;
            }
        };
        match self.storage.set(&self.key, &json) {
            Ok(()) => true,
            Err(err) => {
                warn!("BeaconBuffer failed to persist buffer '{}': {err}", self.key);
                false
            }
        }
    }

    fn remove_key(&self) {
        if let Err(err) = self.storage.remove(&self.key) {
            warn!("BeaconBuffer failed to clear buffer '{}': {err}", self.key);
        }
    }
}
