//! # Polip Core
//!
//! Pure primitives for the Polip device protocol: device identity, the
//! anti-replay sequence counter, envelopes, and envelope tagging.
//!
//! This crate contains no I/O and no networking. Nothing in it mutates a
//! counter or an envelope behind the caller's back.
//!
//! ## Key Types
//!
//! - [`DeviceIdentity`] - Who the device is and which key it signs with
//! - [`SequenceState`] - The per-device counter with optional rollover
//! - [`Envelope`] - An ordered JSON message exchanged with the ingest service
//! - [`Tag`] - Hex HMAC-SHA256 over an envelope's canonical form
//!
//! ## Tagging
//!
//! ```rust
//! use polip_core::{DeviceIdentity, EnvelopeBuilder};
//!
//! let identity = DeviceIdentity::new(
//!     "https://ingest.example",
//!     "fake-0-0001",
//!     "revocable-key-1",
//!     "v0.0.0",
//!     "v0.0.0",
//! );
//! let mut envelope = EnvelopeBuilder::default()
//!     .identity(&identity)
//!     .timestamp("2024-01-01T00:00:00.000Z")
//!     .value(0)
//!     .build();
//!
//! let codec = identity.codec();
//! codec.seal(&mut envelope);
//! assert!(codec.verify(&envelope));
//! ```

pub mod canonical;
pub mod crypto;
pub mod envelope;
pub mod error;
pub mod format;
pub mod identity;
pub mod sequence;
pub mod types;

pub use canonical::{canonical_bytes, sign, signing_bytes, verify, EnvelopeCodec};
pub use crypto::SharedKey;
pub use envelope::{fields, timestamp_now, Envelope, EnvelopeBuilder};
pub use error::CoreError;
pub use identity::{format_version, DeviceIdentity};
pub use sequence::SequenceState;
pub use types::Tag;
