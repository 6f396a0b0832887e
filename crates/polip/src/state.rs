//! Persisted device state.
//!
//! A device that restarts can save its credentials together with the
//! current counter and pick up where it left off instead of resyncing.

use polip_core::SharedKey;
use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;

/// Snapshot of a device's identity and counter.
///
/// Contains the shared key: store it as carefully as the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub serial: String,
    pub key: SharedKey,
    pub hardware: String,
    pub firmware: String,
    pub rollover: Option<u64>,
    pub url: String,
    pub value: u64,
    pub skip_tag_check: bool,
}

impl From<DeviceState> for DeviceConfig {
    fn from(state: DeviceState) -> Self {
        DeviceConfig {
            url: state.url,
            serial: state.serial,
            key: state.key,
            hardware: state.hardware,
            firmware: state.firmware,
            rollover: state.rollover,
            value: state.value,
            skip_tag_check: state.skip_tag_check,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_field_names() {
        let state = DeviceState {
            serial: "fake-0-0001".into(),
            key: SharedKey::new("revocable-key-1"),
            hardware: "v0.0.0".into(),
            firmware: "v0.0.0".into(),
            rollover: Some(1 << 32),
            url: "https://api.okospolip.com:3022".into(),
            value: 12,
            skip_tag_check: false,
        };

        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            json!({
                "serial": "fake-0-0001",
                "key": "revocable-key-1",
                "hardware": "v0.0.0",
                "firmware": "v0.0.0",
                "rollover": 4294967296u64,
                "url": "https://api.okospolip.com:3022",
                "value": 12,
                "skipTagCheck": false,
            })
        );
    }

    #[test]
    fn test_null_rollover_is_unbounded() {
        let state: DeviceState = serde_json::from_value(json!({
            "serial": "s",
            "key": "k",
            "hardware": "h",
            "firmware": "f",
            "rollover": null,
            "url": "http://localhost",
            "value": 3,
            "skipTagCheck": true,
        }))
        .unwrap();

        let config = DeviceConfig::from(state);
        assert_eq!(config.rollover, None);
        assert_eq!(config.value, 3);
        assert!(config.skip_tag_check);
    }
}
