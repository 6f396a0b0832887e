//! Error types for the client.

use polip_core::CoreError;
use serde_json::Value;
use thiserror::Error;

/// Failures reported by a [`Transport`](crate::Transport) when no response arrived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("unreachable: {0}")]
    Unreachable(String),

    /// The request timed out.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Any other transport-level failure.
    #[error("{0}")]
    Other(String),
}

/// Errors that can occur during protocol operations.
///
/// Every variant names the operation, and the endpoint when a request
/// was attempted, so callers can log and decide whether to alert.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// No response: the server is unreachable or the transport failed.
    #[error("{operation} ({endpoint}): communication failed: {source}")]
    Communication {
        operation: String,
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// Non-success status that is not the desync signal.
    #[error("{operation} ({endpoint}): server error {status}: {body}")]
    Server {
        operation: String,
        endpoint: String,
        status: u16,
        body: Value,
    },

    /// The server rejected the envelope's sequence value.
    #[error("{operation} ({endpoint}): sequence value rejected (status {status})")]
    ValueDesync {
        operation: String,
        endpoint: String,
        status: u16,
        body: Value,
    },

    /// The response tag did not match. Never retried.
    #[error("{operation} ({endpoint}): response tag mismatch")]
    Integrity { operation: String, endpoint: String },

    /// A success response whose body could not be used.
    #[error("{operation} ({endpoint}): malformed response: {reason}")]
    ResponseDeserialization {
        operation: String,
        endpoint: String,
        reason: String,
    },

    /// A retry budget ran out.
    #[error("{operation}: retries exhausted after {attempts} attempts")]
    RetriesExhausted { operation: String, attempts: u32 },

    /// The session could not be configured.
    #[error("invalid configuration: {0}")]
    Config(#[from] CoreError),
}

impl ProtocolError {
    /// Whether this is the recoverable counter-desync signal.
    pub fn is_value_desync(&self) -> bool {
        matches!(self, ProtocolError::ValueDesync { .. })
    }

    /// Whether this is a response integrity failure.
    pub fn is_integrity(&self) -> bool {
        matches!(self, ProtocolError::Integrity { .. })
    }

    /// Whether a retry budget was exhausted.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ProtocolError::RetriesExhausted { .. })
    }

    /// The operation the error came from, if known.
    pub fn operation(&self) -> Option<&str> {
        match self {
            ProtocolError::Communication { operation, .. }
            | ProtocolError::Server { operation, .. }
            | ProtocolError::ValueDesync { operation, .. }
            | ProtocolError::Integrity { operation, .. }
            | ProtocolError::ResponseDeserialization { operation, .. }
            | ProtocolError::RetriesExhausted { operation, .. } => Some(operation),
            ProtocolError::Config(_) => None,
        }
    }
}

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
