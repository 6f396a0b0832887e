//! Cryptographic primitives for the Polip protocol.
//!
//! Wraps HMAC-SHA256 keyed by the device's revocable shared key.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Length in bytes of an HMAC-SHA256 digest.
pub const DIGEST_LEN: usize = 32;

/// The revocable secret a device shares with the ingest service.
///
/// Keys are issued as strings; the UTF-8 bytes of the string are the HMAC key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedKey(String);

impl SharedKey {
    /// Wrap a key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key bytes used as the HMAC secret.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The key string, for persisting device state.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(self.as_bytes()).expect("HMAC accepts keys of any length")
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

impl From<&str> for SharedKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SharedKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Compute HMAC-SHA256 of `message` under `key`.
pub fn hmac_sha256(key: &SharedKey, message: &[u8]) -> [u8; DIGEST_LEN] {
    let mut mac = key.mac();
    mac.update(message);
    let bytes = mac.finalize().into_bytes();
    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(&bytes);
    digest
}

/// Check `expected` against HMAC-SHA256 of `message` in constant time.
pub fn verify_hmac_sha256(key: &SharedKey, message: &[u8], expected: &[u8]) -> bool {
    let mut mac = key.mac();
    mac.update(message);
    mac.verify_slice(expected).is_ok()
}
