//! Error types for the Polip core primitives.
//!
//! Signing, verification and counter arithmetic never fail; these errors
//! only come out of constructors that validate configuration.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("rollover must be a positive integer")]
    ZeroRollover,

    #[error("sequence value {value} is outside rollover bound {rollover}")]
    ValueOutOfRange { value: u64, rollover: u64 },

    #[error("malformed tag: {0}")]
    MalformedTag(String),
}
