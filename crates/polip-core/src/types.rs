//! Strong type definitions for the Polip protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::DIGEST_LEN;
use crate::error::CoreError;

/// An envelope tag: lowercase hex HMAC-SHA256, or the `"0"` sentinel.
///
/// The sentinel stands in for the tag while an envelope is being signed,
/// and is what devices running with tag checks disabled transmit.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Wire value of the sentinel tag.
    pub const SENTINEL: &'static str = "0";

    /// The sentinel tag.
    pub fn sentinel() -> Self {
        Self(Self::SENTINEL.to_string())
    }

    /// Hex-encode a digest into a tag.
    pub fn from_digest(digest: [u8; DIGEST_LEN]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse a tag from its wire form.
    ///
    /// Accepts the sentinel or exactly 64 lowercase hex characters.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if s == Self::SENTINEL {
            return Ok(Self::sentinel());
        }
        if s.len() != DIGEST_LEN * 2 {
            return Err(CoreError::MalformedTag(format!(
                "expected {} hex characters, got {}",
                DIGEST_LEN * 2,
                s.len()
            )));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(CoreError::MalformedTag("not lowercase hex".into()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::SENTINEL
    }

    /// Decode into raw digest bytes. The sentinel has no digest.
    pub fn to_digest(&self) -> Option<[u8; DIGEST_LEN]> {
        if self.is_sentinel() {
            return None;
        }
        let mut out = [0u8; DIGEST_LEN];
        hex::decode_to_slice(&self.0, &mut out).ok()?;
        Some(out)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            f.write_str("Tag(sentinel)")
        } else {
            write!(f, "Tag({})", &self.0[..16])
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}
