//! Device identity: the immutable half of a device session.

use crate::canonical::EnvelopeCodec;
use crate::crypto::SharedKey;
use crate::error::CoreError;

/// Who a device is and how it authenticates.
///
/// Identity never changes during a session; the mutable sequence counter
/// lives separately in [`SequenceState`](crate::SequenceState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    base_url: String,
    serial: String,
    key: SharedKey,
    hardware: String,
    firmware: String,
    skip_tag_check: bool,
}

impl DeviceIdentity {
    /// Create an identity with tag checks enabled.
    pub fn new(
        base_url: impl Into<String>,
        serial: impl Into<String>,
        key: impl Into<SharedKey>,
        hardware: impl Into<String>,
        firmware: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            serial: serial.into(),
            key: key.into(),
            hardware: hardware.into(),
            firmware: firmware.into(),
            skip_tag_check: false,
        }
    }

    /// Disable signing and verification entirely.
    ///
    /// Only for trusted or offline testing setups.
    pub fn with_skip_tag_check(mut self, skip: bool) -> Self {
        self.skip_tag_check = skip;
        self
    }

    /// Check that the identity can be used to talk to a server.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.base_url.is_empty() {
            return Err(CoreError::InvalidIdentity("base url is empty".into()));
        }
        if self.serial.is_empty() {
            return Err(CoreError::InvalidIdentity("serial is empty".into()));
        }
        if self.key.is_empty() && !self.skip_tag_check {
            return Err(CoreError::InvalidIdentity(
                "key is empty and tag checks are enabled".into(),
            ));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn key(&self) -> &SharedKey {
        &self.key
    }

    pub fn hardware(&self) -> &str {
        &self.hardware
    }

    pub fn firmware(&self) -> &str {
        &self.firmware
    }

    pub fn skip_tag_check(&self) -> bool {
        self.skip_tag_check
    }

    /// The codec for this device's key and tag policy.
    pub fn codec(&self) -> EnvelopeCodec<'_> {
        EnvelopeCodec::new(&self.key, self.skip_tag_check)
    }

    /// Join a path such as `/api/v1/device/push` onto the base URL.
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Standard format for hardware and firmware version strings.
pub fn format_version(major: u32, minor: u32, patch: u32) -> String {
    format!("v{}.{}.{}", major, minor, patch)
}
