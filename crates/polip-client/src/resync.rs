//! Resync-and-retry around protocol operations.
//!
//! When the server rejects an envelope's counter, the device fetches the
//! authoritative value and tries the operation once more:
//!
//! ```text
//! Attempt(retry) --ok--> done
//!      |  desync
//!      v
//! Resyncing --get_value--> Attempt(final) --ok--> done
//!                               |  desync
//!                               v
//!                            Failed (RetriesExhausted)
//! ```
//!
//! Every other error leaves the machine immediately. Integrity failures,
//! server errors and communication errors are never retried here.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::error::{ProtocolError, Result};
use crate::session::DeviceSession;
use crate::transport::Transport;

/// Something that can refresh a device's counter from the server.
#[async_trait]
pub trait ValueSource: Send + Sync {
    /// Fetch the authoritative counter and adopt it locally.
    async fn refresh_value(&self) -> Result<()>;
}

#[async_trait]
impl<T: Transport> ValueSource for DeviceSession<T> {
    async fn refresh_value(&self) -> Result<()> {
        self.get_value().await.map(|_| ())
    }
}

/// An error that can carry the counter-desync signal.
///
/// Lets callers layer their own error type over [`ProtocolError`] and still
/// run operations under [`with_resync`].
pub trait DesyncAware: From<ProtocolError> + fmt::Display {
    fn is_value_desync(&self) -> bool;
}

impl DesyncAware for ProtocolError {
    fn is_value_desync(&self) -> bool {
        matches!(self, ProtocolError::ValueDesync { .. })
    }
}

/// States of the resync machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResyncState {
    /// Run the operation. `retry_allowed` is false on the final attempt.
    Attempt { retry_allowed: bool },
    /// Refresh the counter before the final attempt.
    Resyncing,
    /// The final attempt was rejected too.
    Failed,
}

impl ResyncState {
    /// Where every external call starts.
    pub const INITIAL: Self = ResyncState::Attempt {
        retry_allowed: true,
    };

    /// Next state after an attempt reported a counter desync.
    pub fn on_desync(self) -> Self {
        match self {
            ResyncState::Attempt {
                retry_allowed: true,
            } => ResyncState::Resyncing,
            _ => ResyncState::Failed,
        }
    }
}

/// Run `op`, resyncing and retrying once if the server reports desync.
///
/// `op` is called at most twice and `source` refreshed at most once.
/// A second desync yields [`ProtocolError::RetriesExhausted`].
pub async fn with_resync<V, F, Fut, R, E>(
    source: &V,
    operation: &str,
    mut op: F,
) -> std::result::Result<R, E>
where
    V: ValueSource + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<R, E>>,
    E: DesyncAware,
{
    let mut state = ResyncState::INITIAL;
    let mut attempts = 0u32;

    loop {
        state = match state {
            ResyncState::Attempt { .. } => {
                attempts += 1;
                match op().await {
                    Ok(result) => return Ok(result),
                    Err(error) if error.is_value_desync() => {
                        tracing::warn!(operation, attempts, %error, "counter desync");
                        state.on_desync()
                    }
                    Err(error) => return Err(error),
                }
            }
            ResyncState::Resyncing => {
                source.refresh_value().await.map_err(E::from)?;
                ResyncState::Attempt {
                    retry_allowed: false,
                }
            }
            ResyncState::Failed => {
                return Err(E::from(ProtocolError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts,
                }))
            }
        };
    }
}
