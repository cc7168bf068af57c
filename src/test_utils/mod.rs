//! Helpers for driving the engine deterministically in tests.
//!
//! Compiled for unit tests and, through the `test-util` feature, for
//! integration tests and downstream crates.

mod manual_timers;
mod recording_transport;

pub use manual_timers::ManualTimers;
pub use recording_transport::{RecordedCall, RecordingTransport};
