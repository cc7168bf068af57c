//! HTTP implementation of [`Transport`](super::Transport).
//!
//! [`HttpTransport`] accepts payloads into a bounded queue and returns
//! immediately; a worker thread POSTs them to the collector. "Accepted"
//! therefore means "queued", mirroring a browser beacon: the engine never
//! learns whether the collector received the payload.

mod config;
mod worker;

#[cfg(test)]
mod tests;

use std::{thread, time::Duration};

use crossbeam_channel::Sender;
use log::warn;
use parking_lot::Mutex;

pub use config::{AuthConfig, HttpTransportConfig};

use super::Transport;
use worker::{Delivery, HttpCommand, enqueue_delivery, flush_queue, spawn_worker};

pub struct HttpTransport {
    tx: Mutex<Option<Sender<HttpCommand>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    /// Bound on flush and shutdown waits; one request's worth of time.
    flush_timeout: Duration,
}

impl HttpTransport {
    /// Start the worker thread.
    pub fn with_config(config: HttpTransportConfig) -> std::io::Result<Self> {
        let flush_timeout = config.write_timeout;
        let (tx, handle) = spawn_worker(config)?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            flush_timeout,
        })
    }

    /// Wait until every payload queued so far has been attempted.
    pub fn flush(&self) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        flush_queue(&tx, self.flush_timeout)
    }

    /// Drain the queue and stop the worker. Later sends are refused.
    pub fn close(&self) {
        self.request_shutdown();
        self.join_worker();
    }

    fn sender(&self) -> Option<Sender<HttpCommand>> {
        self.tx.lock().as_ref().cloned()
    }

    fn request_shutdown(&self) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        if tx.send(HttpCommand::Shutdown(ack_tx)).is_err() {
            return;
        }
        let _ = ack_rx.recv_timeout(self.flush_timeout);
    }

    fn join_worker(&self) {
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("HttpTransport: worker thread panicked");
        }
    }
}

impl Transport for HttpTransport {
    fn send_best_effort(&self, url: &str, payload: &str, content_type: &str) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        enqueue_delivery(
            &tx,
            Delivery {
                url: url.to_owned(),
                payload: payload.to_owned(),
                content_type: content_type.to_owned(),
            },
        )
    }
}

impl Drop for HttpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}
