//! The device: a session plus the ingest service's endpoints.
//!
//! Each endpoint wrapper builds its payload, checks it, and hands it to the
//! session for one signed round trip. None of them retries on its own; wrap
//! calls in [`PolipDevice::with_resync`] to recover from counter desync.

use std::future::Future;
use std::sync::Arc;

use polip_client::{
    BootstrapConfig, DeviceSession, RequestOptions, SessionConfig, SessionObserver, Transport,
};
use polip_core::{DeviceIdentity, Envelope, SequenceState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::DeviceConfig;
use crate::constants::{paths, RpcStatus};
use crate::error::{DeviceError, Result};
use crate::state::DeviceState;

/// Which sections [`PolipDevice::get_state`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetStateParams {
    pub state: bool,
    pub meta: bool,
    pub sensors: bool,
    pub rpc: bool,
    pub manufacturer: bool,
}

impl Default for GetStateParams {
    /// Only the state section.
    fn default() -> Self {
        Self {
            state: true,
            meta: false,
            sensors: false,
            rpc: false,
            manufacturer: false,
        }
    }
}

impl GetStateParams {
    /// Query string in the order the service documents.
    pub fn query(&self) -> String {
        format!(
            "meta={}&state={}&sensors={}&rpc={}&manufacturer={}",
            self.meta, self.state, self.sensors, self.rpc, self.manufacturer
        )
    }
}

/// Outcome of a remote procedure call, reported back to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResult {
    pub uuid: String,
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RpcStatus>,
}

impl RpcResult {
    pub fn new(uuid: impl Into<String>, result: impl Into<Value>) -> Self {
        Self {
            uuid: uuid.into(),
            result: result.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: RpcStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn check(&self) -> std::result::Result<(), &'static str> {
        if self.uuid.is_empty() {
            return Err("RPC must have uuid");
        }
        if self.result.is_null() {
            return Err("RPC must have result");
        }
        Ok(())
    }
}

/// A device talking to the ingest service.
pub struct PolipDevice<T: Transport> {
    session: DeviceSession<T>,
}

impl<T: Transport> PolipDevice<T> {
    /// Open a device with the default session behavior.
    pub fn new(config: DeviceConfig, transport: T) -> Result<Self> {
        Self::with_session_config(config, transport, SessionConfig::default())
    }

    pub fn with_session_config(
        config: DeviceConfig,
        transport: T,
        session_config: SessionConfig,
    ) -> Result<Self> {
        let identity = config.identity();
        identity.validate()?;
        let sequence = config.sequence()?;
        let session = DeviceSession::new(identity, sequence, transport, session_config)?;
        Ok(Self { session })
    }

    /// Reopen a device from saved state.
    pub fn from_state(state: DeviceState, transport: T) -> Result<Self> {
        Self::new(state.into(), transport)
    }

    /// Wrap an existing session.
    pub fn from_session(session: DeviceSession<T>) -> Self {
        Self { session }
    }

    /// Replace the default tracing observer.
    pub fn with_observer(self, observer: Arc<dyn SessionObserver>) -> Self {
        Self {
            session: self.session.with_observer(observer),
        }
    }

    pub fn session(&self) -> &DeviceSession<T> {
        &self.session
    }

    pub fn identity(&self) -> &DeviceIdentity {
        self.session.identity()
    }

    /// The counter value the next request will carry.
    pub async fn value(&self) -> u64 {
        self.session.sequence().await.value()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Probe the health endpoint. Never fails.
    pub async fn check_server_status(&self) -> bool {
        self.session.check_server_status().await
    }

    /// Poll the server-side device state.
    pub async fn get_state(&self, params: GetStateParams) -> Result<Envelope> {
        let endpoint = format!("{}?{}", paths::POLL, params.query());
        self.signed("get_state", &endpoint, Map::new()).await
    }

    /// Push device state. `state` must be a JSON object.
    pub async fn push_state(&self, state: Value) -> Result<Envelope> {
        const OPERATION: &str = "push_state";
        if !state.is_object() {
            return Err(DeviceError::invalid_argument(
                OPERATION,
                "state object must be provided",
            ));
        }
        self.signed(OPERATION, paths::PUSH, payload("state", state))
            .await
    }

    /// Push an informational message, i.e. an error with code 0.
    pub async fn push_notification(&self, message: impl Into<String>) -> Result<Envelope> {
        self.push_error(message, 0).await
    }

    /// Push an error report.
    pub async fn push_error(&self, message: impl Into<String>, code: i64) -> Result<Envelope> {
        let mut body = Map::new();
        body.insert("code".into(), Value::from(code));
        body.insert("message".into(), Value::from(message.into()));
        self.signed("push_error", paths::ERROR, body).await
    }

    /// Push sensor readings. `sensors` must be a JSON object.
    pub async fn push_sensors(&self, sensors: Value) -> Result<Envelope> {
        const OPERATION: &str = "push_sensors";
        if !sensors.is_object() {
            return Err(DeviceError::invalid_argument(
                OPERATION,
                "sensor object must be provided",
            ));
        }
        self.signed(OPERATION, paths::SENSE, payload("sense", sensors))
            .await
    }

    /// Report the outcome of a remote procedure call.
    pub async fn push_rpc(&self, rpc: &RpcResult) -> Result<Envelope> {
        const OPERATION: &str = "push_rpc";
        rpc.check()
            .map_err(|reason| DeviceError::invalid_argument(OPERATION, reason))?;
        let rpc = serde_json::to_value(rpc)
            .map_err(|e| DeviceError::invalid_argument(OPERATION, e.to_string()))?;
        self.signed(OPERATION, paths::RPC, payload("rpc", rpc)).await
    }

    /// Fetch the device's state schema.
    pub async fn get_schema(&self) -> Result<Envelope> {
        self.signed("get_schema", paths::SCHEMA, Map::new()).await
    }

    /// Look up error semantics, for one code or all of them.
    pub async fn get_error_semantic(&self, code: Option<i64>) -> Result<Envelope> {
        let endpoint = match code {
            Some(code) => format!("{}?code={}", paths::ERROR_SEMANTIC, code),
            None => paths::ERROR_SEMANTIC.to_string(),
        };
        self.signed("get_error_semantic", &endpoint, Map::new())
            .await
    }

    /// Fetch the server's counter and adopt it. Untagged in both directions.
    pub async fn get_value(&self) -> Result<Envelope> {
        Ok(self.session.get_value().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Recovery
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `op`, resyncing the counter and retrying once on desync.
    ///
    /// ```rust,no_run
    /// # async fn example<T: polip_client::Transport>(device: polip::PolipDevice<T>) -> polip::Result<()> {
    /// let ack = device
    ///     .with_resync("push_state", |d| d.push_state(serde_json::json!({"power": true})))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_resync<'a, F, Fut, R>(&'a self, operation: &str, mut op: F) -> Result<R>
    where
        F: FnMut(&'a Self) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        polip_client::with_resync(&self.session, operation, || op(self)).await
    }

    /// Block until the server answers its health probe.
    pub async fn await_server_ok<F: FnOnce()>(
        &self,
        config: &BootstrapConfig,
        on_connect: Option<F>,
    ) -> Result<()> {
        Ok(polip_client::await_server_ok(&self.session, config, on_connect).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Persistence
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot identity and counter, e.g. before shutting down.
    pub async fn export_state(&self) -> DeviceState {
        let identity = self.session.identity();
        let sequence = self.session.sequence().await;
        DeviceState {
            serial: identity.serial().to_string(),
            key: identity.key().clone(),
            hardware: identity.hardware().to_string(),
            firmware: identity.firmware().to_string(),
            rollover: sequence.rollover(),
            url: identity.base_url().to_string(),
            value: sequence.value(),
            skip_tag_check: identity.skip_tag_check(),
        }
    }

    /// Restore the counter from saved state for this same device.
    ///
    /// The identity is fixed for the device's lifetime; use
    /// [`from_state`](Self::from_state) to open a different one.
    pub async fn import_state(&self, state: &DeviceState) -> Result<()> {
        const OPERATION: &str = "import_state";
        let identity = self.session.identity();
        if state.serial != identity.serial() {
            return Err(DeviceError::invalid_argument(
                OPERATION,
                format!("state belongs to {}, not {}", state.serial, identity.serial()),
            ));
        }
        if state.key != *identity.key() {
            return Err(DeviceError::invalid_argument(
                OPERATION,
                "state was saved with a different key",
            ));
        }

        let sequence = SequenceState::new(state.value, state.rollover)?;
        self.session.replace_sequence(sequence).await;
        tracing::info!(serial = %state.serial, value = state.value, "restored device counter");
        Ok(())
    }

    async fn signed(
        &self,
        operation: &str,
        endpoint: &str,
        body: Map<String, Value>,
    ) -> Result<Envelope> {
        Ok(self
            .session
            .execute(operation, endpoint, body, RequestOptions::SIGNED)
            .await?)
    }
}

fn payload(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}
