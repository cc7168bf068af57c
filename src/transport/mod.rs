//! Best-effort delivery consumed by the engine.
//!
//! A [`Transport`] only reports whether a payload was *accepted* for
//! asynchronous delivery. Arrival is never confirmed and an accepted
//! payload cannot be recalled.

pub mod http;

pub use http::{AuthConfig, HttpTransport, HttpTransportConfig};

pub trait Transport: Send + Sync {
    /// Hand `payload` to the delivery primitive.
    ///
    /// Returns `true` when the payload was accepted, `false` when it was
    /// refused outright (e.g. a full queue or a closed channel).
    fn send_best_effort(&self, url: &str, payload: &str, content_type: &str) -> bool;
}
