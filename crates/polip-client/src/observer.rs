//! Session observers.
//!
//! A session reports what it does to an injected observer instead of
//! consulting a global verbosity switch. [`TracingObserver`] is the default
//! and turns events into `tracing` records; the key is never reported.

use polip_core::Envelope;

use crate::error::{ProtocolError, TransportError};

/// Receives protocol events from a [`DeviceSession`](crate::DeviceSession).
///
/// All methods default to doing nothing.
pub trait SessionObserver: Send + Sync {
    /// A request envelope is about to be posted.
    fn request_sent(&self, _operation: &str, _url: &str, _envelope: &Envelope) {}

    /// The server answered.
    fn response_received(&self, _operation: &str, _url: &str, _status: u16) {}

    /// An operation failed.
    fn request_failed(&self, _operation: &str, _error: &ProtocolError) {}

    /// The counter moved forward after a verified round trip.
    fn counter_advanced(&self, _from: u64, _to: u64) {}

    /// The counter was overwritten with the server's value.
    fn counter_resynced(&self, _from: u64, _to: u64) {}

    /// A reachability probe finished.
    fn server_status(&self, _url: &str, _ok: bool) {}

    /// The health endpoint could not be reached at all.
    fn server_unreachable(&self, _url: &str, _error: &TransportError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SessionObserver for TracingObserver {
    fn request_sent(&self, operation: &str, url: &str, envelope: &Envelope) {
        tracing::debug!(
            operation,
            url,
            value = envelope.value(),
            timestamp = envelope.timestamp(),
            "sending envelope"
        );
        tracing::trace!(operation, body = %envelope, "envelope body");
    }

    fn response_received(&self, operation: &str, url: &str, status: u16) {
        tracing::debug!(operation, url, status, "response received");
    }

    fn request_failed(&self, operation: &str, error: &ProtocolError) {
        tracing::warn!(operation, %error, "request failed");
    }

    fn counter_advanced(&self, from: u64, to: u64) {
        tracing::trace!(from, to, "sequence advanced");
    }

    fn counter_resynced(&self, from: u64, to: u64) {
        tracing::info!(from, to, "sequence resynced from server");
    }

    fn server_status(&self, url: &str, ok: bool) {
        tracing::debug!(url, ok, "server status probe");
    }

    fn server_unreachable(&self, url: &str, error: &TransportError) {
        tracing::debug!(url, %error, "health endpoint unreachable");
    }
}
