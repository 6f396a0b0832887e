//! Canonical envelope encoding and tagging.
//!
//! The tag of an envelope is HMAC-SHA256 over the compact JSON text of the
//! envelope with its `tag` field set to the sentinel `"0"`. The tag field
//! keeps its position, so a signed envelope and its signing form differ
//! only in the tag's value.
//!
//! The signing serialization and the transmitted serialization come from
//! the same encoder ([`canonical_bytes`]). Key order is insertion order.

use crate::crypto::{hmac_sha256, verify_hmac_sha256, SharedKey};
use crate::envelope::{fields, Envelope};
use crate::types::Tag;

/// Encode an envelope exactly as it goes on the wire.
pub fn canonical_bytes(envelope: &Envelope) -> Vec<u8> {
    envelope.to_canonical_string().into_bytes()
}

/// The bytes a tag is computed over: the envelope with `tag = "0"`.
pub fn signing_bytes(envelope: &Envelope) -> Vec<u8> {
    let mut unsigned = envelope.clone();
    unsigned.insert(fields::TAG, Tag::SENTINEL);
    canonical_bytes(&unsigned)
}

/// Compute the tag for an envelope.
///
/// The envelope itself is untouched; assign the tag with
/// [`Envelope::set_tag`] before sending.
pub fn sign(envelope: &Envelope, key: &SharedKey) -> Tag {
    Tag::from_digest(hmac_sha256(key, &signing_bytes(envelope)))
}

/// Check the tag carried by a received envelope.
///
/// Returns true only if the `tag` field is present, is a well-formed
/// digest, and matches the recomputed tag exactly.
pub fn verify(envelope: &Envelope, key: &SharedKey) -> bool {
    let Some(claimed) = envelope.tag().and_then(|t| Tag::parse(t).ok()) else {
        return false;
    };
    let Some(digest) = claimed.to_digest() else {
        return false;
    };
    verify_hmac_sha256(key, &signing_bytes(envelope), &digest)
}

/// Signs and verifies envelopes under one device's tag policy.
///
/// With tag checks skipped, every envelope is signed with the sentinel and
/// every response verifies.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeCodec<'a> {
    key: &'a SharedKey,
    skip_tag_check: bool,
}

impl<'a> EnvelopeCodec<'a> {
    pub fn new(key: &'a SharedKey, skip_tag_check: bool) -> Self {
        Self {
            key,
            skip_tag_check,
        }
    }

    pub fn skips_tag_check(&self) -> bool {
        self.skip_tag_check
    }

    /// Compute the tag for an envelope under this policy.
    pub fn sign(&self, envelope: &Envelope) -> Tag {
        if self.skip_tag_check {
            Tag::sentinel()
        } else {
            sign(envelope, self.key)
        }
    }

    /// Sign and write the tag into the envelope.
    pub fn seal(&self, envelope: &mut Envelope) -> Tag {
        let tag = self.sign(envelope);
        envelope.set_tag(&tag);
        tag
    }

    /// Verify a received envelope under this policy.
    pub fn verify(&self, envelope: &Envelope) -> bool {
        self.skip_tag_check || verify(envelope, self.key)
    }
}
