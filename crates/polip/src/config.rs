//! Device configuration.

use polip_core::{CoreError, DeviceIdentity, SequenceState, SharedKey};
use serde::{Deserialize, Serialize};

use crate::constants::INGEST_SERVER_URL_SECURE;

/// Everything needed to open a [`PolipDevice`](crate::PolipDevice).
///
/// Serializes with camelCase keys, so it can be loaded from the same JSON a
/// device keeps its credentials in. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceConfig {
    /// Ingest service base URL.
    pub url: String,
    /// Serial identifier, unique per device.
    pub serial: String,
    /// Revocable key used for tagging.
    pub key: SharedKey,
    /// Hardware version reported to the service.
    pub hardware: String,
    /// Firmware version reported to the service.
    pub firmware: String,
    /// Exclusive counter bound; `None` never wraps before `u64::MAX`.
    pub rollover: Option<u64>,
    /// Counter value for the next request.
    pub value: u64,
    /// Send sentinel tags and skip response verification.
    pub skip_tag_check: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            url: INGEST_SERVER_URL_SECURE.to_string(),
            serial: String::new(),
            key: SharedKey::new(""),
            hardware: String::new(),
            firmware: String::new(),
            rollover: None,
            value: 0,
            skip_tag_check: false,
        }
    }
}

impl DeviceConfig {
    /// Config for the default secure ingest URL.
    pub fn new(
        serial: impl Into<String>,
        key: impl Into<SharedKey>,
        hardware: impl Into<String>,
        firmware: impl Into<String>,
    ) -> Self {
        Self {
            serial: serial.into(),
            key: key.into(),
            hardware: hardware.into(),
            firmware: firmware.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_rollover(mut self, rollover: u64) -> Self {
        self.rollover = Some(rollover);
        self
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn with_skip_tag_check(mut self, skip: bool) -> Self {
        self.skip_tag_check = skip;
        self
    }

    /// The identity half of this config.
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(
            self.url.as_str(),
            self.serial.as_str(),
            self.key.clone(),
            self.hardware.as_str(),
            self.firmware.as_str(),
        )
        .with_skip_tag_check(self.skip_tag_check)
    }

    /// The counter half of this config.
    pub fn sequence(&self) -> Result<SequenceState, CoreError> {
        SequenceState::new(self.value, self.rollover)
    }
}
