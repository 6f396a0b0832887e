//! # Polip
//!
//! Device-side client for the Okos Polip ingest service.
//!
//! ## Overview
//!
//! A device reports state and telemetry to the ingest service and polls it
//! for commands. Every message is an envelope carrying the device's serial,
//! versions, a timestamp, an anti-replay counter, and an HMAC tag:
//!
//! - **Envelopes** are tagged with HMAC-SHA256 over their canonical JSON
//! - **The counter** advances after each verified round trip and wraps at the rollover
//! - **Resync** fetches the server's counter and retries once when they disagree
//! - **Bootstrap** waits for the service to come up before the first request
//!
//! ## Usage
//!
//! ```rust,no_run
//! use polip::{DeviceConfig, PolipDevice, DEFAULT_ROLLOVER};
//! use polip::client::{BootstrapConfig, Transport};
//! use serde_json::json;
//!
//! async fn run<T: Transport>(transport: T) -> polip::Result<()> {
//!     let config = DeviceConfig::new("fake-0-0001", "revocable-key-1", "v0.0.0", "v0.0.0")
//!         .with_rollover(DEFAULT_ROLLOVER);
//!     let device = PolipDevice::new(config, transport)?;
//!
//!     device
//!         .await_server_ok(&BootstrapConfig::default(), Some(|| println!("connected")))
//!         .await?;
//!
//!     device
//!         .with_resync("push_state", |d| d.push_state(json!({"power": true})))
//!         .await?;
//!
//!     let saved = device.export_state().await;
//!     println!("next value: {}", saved.value);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `polip::core` - Identity, counter, envelopes, tagging
//! - `polip::client` - Transport port, session, resync, bootstrap

pub mod config;
pub mod constants;
pub mod device;
pub mod error;
pub mod state;

// Re-export component crates
pub use polip_client as client;
pub use polip_core as core;

// Re-export main types for convenience
pub use config::DeviceConfig;
pub use constants::{
    RpcStatus, AWAIT_SERVER_OK_RECHECK_PERIOD, DEFAULT_POLL_STATE_PERIOD,
    DEFAULT_PUSH_SENSE_PERIOD, DEFAULT_ROLLOVER, INGEST_SERVER_ADDRESS, INGEST_SERVER_HTTPS_PORT,
    INGEST_SERVER_HTTP_PORT, INGEST_SERVER_URL, INGEST_SERVER_URL_SECURE,
};
pub use device::{GetStateParams, PolipDevice, RpcResult};
pub use error::{DeviceError, Result};
pub use state::DeviceState;

// Re-export commonly used core types
pub use polip_core::{format_version, DeviceIdentity, Envelope, SequenceState, SharedKey, Tag};
