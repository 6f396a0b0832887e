//! # Polip Client
//!
//! Signed request orchestration for the Polip device protocol.
//!
//! ## Overview
//!
//! A [`DeviceSession`] composes the core envelope codec and sequence
//! counter with a caller-supplied [`Transport`] into one signed round trip.
//! Around it sit two helpers:
//!
//! - [`with_resync`] refreshes the counter and retries once when the server
//!   reports a counter desync
//! - [`await_server_ok`] polls the health endpoint until the service is up
//!
//! ## Usage
//!
//! ```rust,no_run
//! use polip_client::{
//!     await_server_ok, with_resync, BootstrapConfig, DeviceSession, RequestOptions,
//!     SessionConfig, Transport,
//! };
//! use polip_core::{DeviceIdentity, SequenceState};
//! use serde_json::{json, Map};
//!
//! async fn example<T: Transport>(transport: T) -> polip_client::Result<()> {
//!     let identity = DeviceIdentity::new(
//!         "https://api.okospolip.com:3022",
//!         "fake-0-0001",
//!         "revocable-key-1",
//!         "v0.0.0",
//!         "v0.0.0",
//!     );
//!     let session = DeviceSession::new(
//!         identity,
//!         SequenceState::new(0, Some(1 << 32))?,
//!         transport,
//!         SessionConfig::default(),
//!     )?;
//!
//!     await_server_ok(&session, &BootstrapConfig::default(), None::<fn()>).await?;
//!
//!     let ack = with_resync(&session, "push_state", || {
//!         let mut payload = Map::new();
//!         payload.insert("state".into(), json!({"power": true}));
//!         session.execute("push_state", "/api/v1/device/push", payload, RequestOptions::SIGNED)
//!     })
//!     .await?;
//!     println!("acked at value {:?}", ack.value());
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Only the session and the resync handler classify failures; see
//! [`ProtocolError`]. The health probe is the one place errors are folded
//! into a boolean.

pub mod bootstrap;
pub mod error;
pub mod observer;
pub mod resync;
pub mod session;
pub mod transport;

pub use bootstrap::{await_server_ok, BootstrapConfig, StatusProbe, DEFAULT_RECHECK_PERIOD};
pub use error::{ProtocolError, Result, TransportError};
pub use observer::{NoopObserver, SessionObserver, TracingObserver};
pub use resync::{with_resync, DesyncAware, ResyncState, ValueSource};
pub use session::{
    DesyncSignal, DeviceSession, RequestOptions, SessionConfig, HEALTH_PATH, VALUE_INVALID_BODY,
    VALUE_PATH,
};
pub use transport::{
    memory::{RecordedRequest, ScriptedTransport},
    Transport, TransportResponse,
};
