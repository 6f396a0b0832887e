//! Request orchestration for one device.
//!
//! A [`DeviceSession`] owns a device's identity, its sequence counter and a
//! transport, and runs signed round trips:
//!
//! ```text
//! lock counter -> build envelope -> sign -> post -> classify status
//!              -> verify response tag -> advance counter -> unlock
//! ```
//!
//! The counter lock is held for the whole cycle, so two operations on the
//! same device never sign with the same value or advance out of order.
//! Dropping an in-flight operation releases the lock without touching the
//! counter.

use std::fmt;
use std::sync::Arc;

use polip_core::{timestamp_now, DeviceIdentity, Envelope, EnvelopeBuilder, SequenceState};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{ProtocolError, Result};
use crate::observer::{SessionObserver, TracingObserver};
use crate::transport::Transport;

/// Health probe path.
pub const HEALTH_PATH: &str = "/api/v1/";

/// Path of the unauthenticated counter lookup.
pub const VALUE_PATH: &str = "/api/v1/device/value";

/// Response body the ingest service sends when it rejects a counter value.
pub const VALUE_INVALID_BODY: &str = "value invalid";

/// How a non-success response is recognised as a counter desync.
#[derive(Clone)]
pub enum DesyncSignal {
    /// The body is exactly this JSON string.
    Literal(String),
    /// Caller-supplied test over status and body.
    Predicate(Arc<dyn Fn(u16, &Value) -> bool + Send + Sync>),
}

impl DesyncSignal {
    /// Build a predicate signal.
    pub fn predicate(f: impl Fn(u16, &Value) -> bool + Send + Sync + 'static) -> Self {
        DesyncSignal::Predicate(Arc::new(f))
    }

    /// Whether a non-success response signals desync.
    pub fn matches(&self, status: u16, body: &Value) -> bool {
        match self {
            DesyncSignal::Literal(literal) => body.as_str() == Some(literal.as_str()),
            DesyncSignal::Predicate(f) => f(status, body),
        }
    }
}

impl Default for DesyncSignal {
    fn default() -> Self {
        DesyncSignal::Literal(VALUE_INVALID_BODY.to_string())
    }
}

impl fmt::Debug for DesyncSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesyncSignal::Literal(literal) => f.debug_tuple("Literal").field(literal).finish(),
            DesyncSignal::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Configuration for session behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path probed by [`DeviceSession::check_server_status`].
    pub health_path: String,
    /// Path used by [`DeviceSession::get_value`].
    pub value_path: String,
    /// Recognises the server's counter-desync response.
    pub desync_signal: DesyncSignal,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            health_path: HEALTH_PATH.to_string(),
            value_path: VALUE_PATH.to_string(),
            desync_signal: DesyncSignal::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_desync_signal(mut self, signal: DesyncSignal) -> Self {
        self.desync_signal = signal;
        self
    }
}

/// Per-request switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Leave the counter out of the request and do not advance it.
    pub skip_value: bool,
    /// Neither sign the request nor verify the response.
    pub skip_tag: bool,
}

impl RequestOptions {
    /// Counted and tagged: the normal case.
    pub const SIGNED: Self = Self {
        skip_value: false,
        skip_tag: false,
    };

    /// Neither counted nor tagged.
    pub const UNSIGNED: Self = Self {
        skip_value: true,
        skip_tag: true,
    };
}

/// A device's protocol session.
pub struct DeviceSession<T: Transport> {
    /// Who we are.
    identity: DeviceIdentity,
    /// The transport layer.
    transport: T,
    /// Configuration.
    config: SessionConfig,
    /// Event sink.
    observer: Arc<dyn SessionObserver>,
    /// The counter; the lock serialises operations on this device.
    sequence: Mutex<SequenceState>,
}

impl<T: Transport> DeviceSession<T> {
    /// Create a session. Fails if the identity is unusable.
    pub fn new(
        identity: DeviceIdentity,
        sequence: SequenceState,
        transport: T,
        config: SessionConfig,
    ) -> Result<Self> {
        identity.validate()?;
        Ok(Self {
            identity,
            transport,
            config,
            observer: Arc::new(TracingObserver),
            sequence: Mutex::new(sequence),
        })
    }

    /// Replace the default tracing observer.
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Snapshot of the counter.
    ///
    /// Waits for any in-flight operation to finish.
    pub async fn sequence(&self) -> SequenceState {
        *self.sequence.lock().await
    }

    /// Overwrite the counter wholesale, e.g. when restoring saved state.
    pub async fn replace_sequence(&self, sequence: SequenceState) {
        *self.sequence.lock().await = sequence;
    }

    /// Probe the health endpoint.
    ///
    /// Any failure, including a transport error, is reported as `false`.
    pub async fn check_server_status(&self) -> bool {
        let url = self.identity.endpoint_url(&self.config.health_path);
        let ok = match self.transport.get(&url).await {
            Ok(response) => response.is_ok(),
            Err(error) => {
                self.observer.server_unreachable(&url, &error);
                false
            }
        };
        self.observer.server_status(&url, ok);
        ok
    }

    /// Run one round trip against `endpoint` (a path below the base URL).
    ///
    /// Returns the response envelope after its tag was verified. On any
    /// error the counter is left as it was.
    pub async fn execute(
        &self,
        operation: &str,
        endpoint: &str,
        payload: Map<String, Value>,
        options: RequestOptions,
    ) -> Result<Envelope> {
        let mut sequence = self.sequence.lock().await;
        self.round_trip(&mut sequence, operation, endpoint, payload, options)
            .await
    }

    /// Fetch the server's counter and adopt it.
    ///
    /// Neither leg is tagged: the result re-establishes agreement but is
    /// not integrity-checked.
    pub async fn get_value(&self) -> Result<Envelope> {
        const OPERATION: &str = "get_value";

        let mut sequence = self.sequence.lock().await;
        let response = self
            .round_trip(
                &mut sequence,
                OPERATION,
                &self.config.value_path,
                Map::new(),
                RequestOptions::UNSIGNED,
            )
            .await?;

        let Some(value) = response.value() else {
            let error = ProtocolError::ResponseDeserialization {
                operation: OPERATION.to_string(),
                endpoint: self.config.value_path.clone(),
                reason: "ack has no non-negative integer value".into(),
            };
            self.observer.request_failed(OPERATION, &error);
            return Err(error);
        };

        let previous = sequence.value();
        *sequence = sequence.resync(value);
        self.observer.counter_resynced(previous, value);
        Ok(response)
    }

    async fn round_trip(
        &self,
        sequence: &mut SequenceState,
        operation: &str,
        endpoint: &str,
        payload: Map<String, Value>,
        options: RequestOptions,
    ) -> Result<Envelope> {
        let result = self
            .exchange(*sequence, operation, endpoint, payload, options)
            .await;

        match result {
            Ok(response) => {
                if !options.skip_value {
                    let previous = sequence.value();
                    *sequence = sequence.advance();
                    self.observer.counter_advanced(previous, sequence.value());
                }
                Ok(response)
            }
            Err(error) => {
                self.observer.request_failed(operation, &error);
                Err(error)
            }
        }
    }

    /// Build, sign, send, classify and verify. Never touches the counter.
    async fn exchange(
        &self,
        sequence: SequenceState,
        operation: &str,
        endpoint: &str,
        payload: Map<String, Value>,
        options: RequestOptions,
    ) -> Result<Envelope> {
        let url = self.identity.endpoint_url(endpoint);
        let codec = self.identity.codec();

        let mut builder = EnvelopeBuilder::new(payload)
            .identity(&self.identity)
            .timestamp(timestamp_now());
        if !options.skip_value {
            builder = builder.value(sequence.value());
        }
        let mut request = builder.build();
        if !options.skip_tag {
            codec.seal(&mut request);
        }

        self.observer.request_sent(operation, &url, &request);

        let response = self.transport.post(&url, &request).await.map_err(|source| {
            ProtocolError::Communication {
                operation: operation.to_string(),
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        self.observer
            .response_received(operation, &url, response.status);

        if !response.is_ok() {
            if self
                .config
                .desync_signal
                .matches(response.status, &response.body)
            {
                return Err(ProtocolError::ValueDesync {
                    operation: operation.to_string(),
                    endpoint: endpoint.to_string(),
                    status: response.status,
                    body: response.body,
                });
            }
            return Err(ProtocolError::Server {
                operation: operation.to_string(),
                endpoint: endpoint.to_string(),
                status: response.status,
                body: response.body,
            });
        }

        let envelope = Envelope::from_value(response.body).ok_or_else(|| {
            ProtocolError::ResponseDeserialization {
                operation: operation.to_string(),
                endpoint: endpoint.to_string(),
                reason: "response body is not a JSON object".into(),
            }
        })?;

        if !options.skip_tag && !codec.verify(&envelope) {
            return Err(ProtocolError::Integrity {
                operation: operation.to_string(),
                endpoint: endpoint.to_string(),
            });
        }

        Ok(envelope)
    }
}
