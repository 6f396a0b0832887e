//! Service addresses, timing defaults and protocol enumerations.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// DNS name of the device ingest service.
pub const INGEST_SERVER_ADDRESS: &str = "api.okospolip.com";

/// Plain HTTP port.
pub const INGEST_SERVER_HTTP_PORT: u16 = 3021;

/// HTTPS port.
pub const INGEST_SERVER_HTTPS_PORT: u16 = 3022;

/// Plain HTTP ingest URL. Only for state that is not sensitive.
pub const INGEST_SERVER_URL: &str = "http://api.okospolip.com:3021";

/// HTTPS ingest URL, the default.
pub const INGEST_SERVER_URL_SECURE: &str = "https://api.okospolip.com:3022";

/// Suggested period for polling device state.
pub const DEFAULT_POLL_STATE_PERIOD: Duration = Duration::from_millis(1000);

/// Suggested period for pushing sensor readings.
pub const DEFAULT_PUSH_SENSE_PERIOD: Duration = Duration::from_millis(1000);

/// Wait between connectivity probes while bootstrapping.
pub const AWAIT_SERVER_OK_RECHECK_PERIOD: Duration = polip_client::DEFAULT_RECHECK_PERIOD;

/// 32-bit counter rollover.
pub const DEFAULT_ROLLOVER: u64 = 1 << 32;

/// Endpoint paths below the ingest URL.
pub mod paths {
    pub const HEALTH: &str = polip_client::HEALTH_PATH;
    pub const POLL: &str = "/api/v1/device/poll";
    pub const PUSH: &str = "/api/v1/device/push";
    pub const ERROR: &str = "/api/v1/device/error";
    pub const SENSE: &str = "/api/v1/device/sense";
    pub const RPC: &str = "/api/v1/device/rpc";
    pub const VALUE: &str = polip_client::VALUE_PATH;
    pub const SCHEMA: &str = "/api/v1/device/schema";
    pub const ERROR_SEMANTIC: &str = "/api/v1/device/error/semantic";
}

/// Status of a remote procedure call as reported to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpcStatus {
    Pending,
    Success,
    Failure,
    Rejected,
    Acknowledged,
    Canceled,
}

impl RpcStatus {
    pub const ALL: [RpcStatus; 6] = [
        RpcStatus::Pending,
        RpcStatus::Success,
        RpcStatus::Failure,
        RpcStatus::Rejected,
        RpcStatus::Acknowledged,
        RpcStatus::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RpcStatus::Pending => "pending",
            RpcStatus::Success => "success",
            RpcStatus::Failure => "failure",
            RpcStatus::Rejected => "rejected",
            RpcStatus::Acknowledged => "acknowledged",
            RpcStatus::Canceled => "canceled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
