//! Connectivity bootstrap.
//!
//! Polls the health endpoint until the ingest service answers, waiting a
//! fixed period between probes. The loop can be cancelled by dropping its
//! future, e.g. under `tokio::time::timeout`.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProtocolError, Result};
use crate::session::DeviceSession;
use crate::transport::Transport;

/// Default wait between probes.
pub const DEFAULT_RECHECK_PERIOD: Duration = Duration::from_millis(500);

/// Configuration for the bootstrap loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Wait between failed probes.
    pub recheck_period: Duration,
    /// Retries after the first probe; `None` polls forever.
    pub max_retries: Option<u32>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            recheck_period: DEFAULT_RECHECK_PERIOD,
            max_retries: None,
        }
    }
}

impl BootstrapConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_recheck_period(mut self, period: Duration) -> Self {
        self.recheck_period = period;
        self
    }
}

/// A reachability probe.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// True if the server is reachable and healthy. Never fails.
    async fn check_server_status(&self) -> bool;
}

#[async_trait]
impl<T: Transport> StatusProbe for DeviceSession<T> {
    async fn check_server_status(&self) -> bool {
        DeviceSession::check_server_status(self).await
    }
}

/// Block until the server is reachable.
///
/// Calls `on_connect` once connected. With `max_retries = n`, gives up
/// after `n + 1` failed probes.
pub async fn await_server_ok<P, F>(
    probe: &P,
    config: &BootstrapConfig,
    on_connect: Option<F>,
) -> Result<()>
where
    P: StatusProbe + ?Sized,
    F: FnOnce(),
{
    tracing::info!("connecting to device ingest service");
    let mut retries = 0u32;

    loop {
        if probe.check_server_status().await {
            tracing::info!(retries, "connected to device ingest service");
            if let Some(callback) = on_connect {
                callback();
            }
            return Ok(());
        }

        if let Some(max_retries) = config.max_retries {
            if retries >= max_retries {
                tracing::warn!(retries, "giving up on device ingest service");
                return Err(ProtocolError::RetriesExhausted {
                    operation: "await_server_ok".into(),
                    attempts: retries.saturating_add(1),
                });
            }
        }

        retries = retries.saturating_add(1);
        tracing::debug!(retries, "ingest service not reachable, retrying");
        tokio::time::sleep(config.recheck_period).await;
    }
}
