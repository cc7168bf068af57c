//! Worker thread driving HTTP I/O.
//!
//! The worker owns a ureq Agent for connection pooling and POSTs each
//! accepted payload exactly once. Failures are only logged: the engine
//! already treated the payload as handed off.

use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64_STANDARD};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use log::{debug, warn};
use native_tls::TlsConnector;
use ureq::{Agent, AgentBuilder};

use crate::rate_limited_warner::RateLimitedWarner;

use super::config::{AuthConfig, HttpTransportConfig};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum HttpCommand {
    Deliver(Delivery),
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// A payload accepted for delivery.
#[derive(Debug)]
pub struct Delivery {
    pub url: String,
    pub payload: String,
    pub content_type: String,
}

/// Outcome of a single POST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 2xx response.
    Delivered,
    /// Any other status.
    Rejected(u16),
    /// The request never produced a response.
    Failed,
}

/// Spawns the worker thread and returns the sender feeding it.
pub fn spawn_worker(
    config: HttpTransportConfig,
) -> std::io::Result<(Sender<HttpCommand>, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded(config.capacity.max(1));
    let handle = thread::Builder::new()
        .name("beacon-http".into())
        .spawn(move || Worker::new(config).run(rx))?;
    Ok((tx, handle))
}

struct Worker {
    config: HttpTransportConfig,
    agent: Agent,
    warner: RateLimitedWarner,
}

impl Worker {
    fn new(config: HttpTransportConfig) -> Self {
        let mut builder = AgentBuilder::new()
            .timeout_connect(config.connect_timeout)
            .timeout(config.write_timeout);
        match TlsConnector::new() {
            Ok(connector) => builder = builder.tls_connector(Arc::new(connector)),
            Err(err) => warn!("HttpTransport falling back to default TLS: {err}"),
        }
        let agent = builder.build();
        let warner = RateLimitedWarner::new(config.warn_interval);
        Self {
            config,
            agent,
            warner,
        }
    }

    fn deliver(&self, delivery: &Delivery) -> DeliveryOutcome {
        let mut req = self.agent.post(&delivery.url);
        req = self.apply_auth(req);
        for (key, value) in &self.config.request_headers {
            req = req.set(key, value);
        }
        req = req.set("Content-Type", &delivery.content_type);

        match req.send_string(&delivery.payload) {
            Ok(response) => classify_status(response.status()),
            Err(ureq::Error::Status(code, _)) => classify_status(code),
            Err(ureq::Error::Transport(err)) => {
                debug!("HttpTransport request to {} failed: {err}", delivery.url);
                DeliveryOutcome::Failed
            }
        }
    }

    fn apply_auth(&self, req: ureq::Request) -> ureq::Request {
        match &self.config.auth {
            AuthConfig::None => req,
            AuthConfig::Basic { username, password } => {
                let credentials = format!("{username}:{password}");
                let encoded = base64_encode(credentials.as_bytes());
                req.set("Authorization", &format!("Basic {encoded}"))
            }
            AuthConfig::Bearer { token } => req.set("Authorization", &format!("Bearer {token}")),
        }
    }

    fn handle_delivery(&self, delivery: Delivery) {
        match self.deliver(&delivery) {
            DeliveryOutcome::Delivered => {}
            DeliveryOutcome::Rejected(status) => {
                debug!("HttpTransport collector answered {status}");
                self.warn_failure();
            }
            DeliveryOutcome::Failed => self.warn_failure(),
        }
    }

    fn warn_failure(&self) {
        self.warner.record_failure();
        self.warner.warn_if_due(|count| {
            warn!("HttpTransport failed to deliver {count} payloads");
        });
    }

    fn flush_warnings(&self) {
        self.warner.flush(|count| {
            warn!("HttpTransport failed to deliver {count} payloads");
        });
    }

    fn drain_pending(&self, rx: &Receiver<HttpCommand>) {
        loop {
            match rx.try_recv() {
                Ok(HttpCommand::Deliver(delivery)) => self.handle_delivery(delivery),
                Ok(HttpCommand::Flush(ack)) | Ok(HttpCommand::Shutdown(ack)) => {
                    let _ = ack.send(());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    fn run(self, rx: Receiver<HttpCommand>) {
        loop {
            match rx.recv() {
                Ok(HttpCommand::Deliver(delivery)) => self.handle_delivery(delivery),
                Ok(HttpCommand::Flush(ack)) => {
                    self.flush_warnings();
                    let _ = ack.send(());
                }
                Ok(HttpCommand::Shutdown(ack)) => {
                    self.drain_pending(&rx);
                    self.flush_warnings();
                    let _ = ack.send(());
                    break;
                }
                Err(_) => {
                    self.drain_pending(&rx);
                    self.flush_warnings();
                    break;
                }
            }
        }
    }
}

/// Classifies an HTTP status code.
pub(crate) fn classify_status(status: u16) -> DeliveryOutcome {
    match status {
        200..=299 => DeliveryOutcome::Delivered,
        other => DeliveryOutcome::Rejected(other),
    }
}

/// Base64-encode a byte slice for Basic auth.
fn base64_encode(input: &[u8]) -> String {
    BASE64_STANDARD.encode(input)
}

/// Enqueue a delivery without blocking.
///
/// Returns `false` when the queue is full or the worker has gone away.
pub fn enqueue_delivery(tx: &Sender<HttpCommand>, delivery: Delivery) -> bool {
    match tx.try_send(HttpCommand::Deliver(delivery)) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!("HttpTransport queue full; refusing payload");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            debug!("HttpTransport worker gone; refusing payload");
            false
        }
    }
}

/// Sends a flush command to the worker and waits for acknowledgment.
///
/// The acknowledgment arrives once every previously queued delivery has
/// been attempted. The total wait never exceeds `timeout`.
pub fn flush_queue(tx: &Sender<HttpCommand>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(HttpCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    let remaining = deadline.saturating_duration_since(Instant::now());
    ack_rx.recv_timeout(remaining).is_ok()
}
