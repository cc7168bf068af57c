//! Key-value persistence consumed by the buffer.
//!
//! The engine only needs three synchronous operations on string values.
//! [`MemoryStorage`] keeps values in-process; [`FileStorage`] stores one
//! file per key so the buffer survives restarts.

use std::io;

use thiserror::Error;

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors raised by a [`Storage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend refused the write, e.g. because it is full.
    #[error("storage quota exceeded for key {key}")]
    QuotaExceeded { key: String },
    /// The key cannot be represented by the backend.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Synchronous string key-value store.
pub trait Storage: Send + Sync {
    /// Fetch the value stored under `key`, or `None` when absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
