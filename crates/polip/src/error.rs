//! Error types for the device API.

use polip_client::{DesyncAware, ProtocolError};
use polip_core::CoreError;
use thiserror::Error;

/// Errors that can occur during device operations.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Protocol error from the session layer.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid identity, counter or tag.
    #[error("configuration error: {0}")]
    Core(#[from] CoreError),

    /// The call was rejected before anything was sent.
    #[error("{operation}: invalid argument: {reason}")]
    InvalidArgument { operation: String, reason: String },
}

impl DeviceError {
    pub(crate) fn invalid_argument(operation: &str, reason: impl Into<String>) -> Self {
        DeviceError::InvalidArgument {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the server rejected the counter value.
    pub fn is_value_desync(&self) -> bool {
        matches!(self, DeviceError::Protocol(e) if e.is_value_desync())
    }

    /// Whether a response failed tag verification.
    pub fn is_integrity(&self) -> bool {
        matches!(self, DeviceError::Protocol(e) if e.is_integrity())
    }

    /// Whether a retry budget ran out.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, DeviceError::Protocol(e) if e.is_retries_exhausted())
    }

    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            DeviceError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl DesyncAware for DeviceError {
    fn is_value_desync(&self) -> bool {
        DeviceError::is_value_desync(self)
    }
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;
