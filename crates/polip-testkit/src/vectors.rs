//! Golden tag vectors.
//!
//! Each vector is an envelope as a device would build it, the key it is
//! tagged with, and the tag the ingest service expects. Any port of the
//! codec must reproduce these exactly.

use polip_core::{sign, signing_bytes, Envelope, SharedKey};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct TagVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Device key.
    pub key: &'static str,
    /// Envelope JSON before tagging.
    pub envelope: &'static str,
    /// Exact bytes the tag is computed over.
    pub signing_form: &'static str,
    /// Expected tag (lowercase hex).
    pub expected_tag: &'static str,
}

impl TagVector {
    /// Parse the envelope, keeping key order.
    pub fn parse(&self) -> Envelope {
        serde_json::from_str(self.envelope).expect("golden envelope is a JSON object")
    }

    pub fn shared_key(&self) -> SharedKey {
        SharedKey::new(self.key)
    }
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<TagVector> {
    vec![
        TagVector {
            name: "legacy data envelope with numeric serial",
            key: "revocable-key-0",
            envelope: r#"{"serial":1,"timestamp":"2024-01-01T00:00:00.000Z","data":"this is some data"}"#,
            signing_form: r#"{"serial":1,"timestamp":"2024-01-01T00:00:00.000Z","data":"this is some data","tag":"0"}"#,
            expected_tag: "a5bb2b9909863ba2700ca2ad553543bed6a75a4fb679b3f1b9e3627cfef4b438",
        },
        TagVector {
            name: "push state",
            key: "revocable-key-1",
            envelope: r#"{"state":{"power":false,"readonlySpoof":0},"serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":7}"#,
            signing_form: r#"{"state":{"power":false,"readonlySpoof":0},"serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":7,"tag":"0"}"#,
            expected_tag: "d1d20fb6d06b258baf87cf677c9557f33a62e1b2bb1bc074389c1cb70d3bbfa2",
        },
        TagVector {
            name: "empty payload",
            key: "revocable-key-1",
            envelope: r#"{"serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":8}"#,
            signing_form: r#"{"serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":8,"tag":"0"}"#,
            expected_tag: "016580bd57d5e6be0ab27dcbb1948aced5c2bb9bc1680216255a8c738657d1ee",
        },
        TagVector {
            name: "notification",
            key: "revocable-key-1",
            envelope: r#"{"code":0,"message":"Hello World","serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":0}"#,
            signing_form: r#"{"code":0,"message":"Hello World","serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":0,"tag":"0"}"#,
            expected_tag: "a3e6f73445712b8ccd54b0f8893730b622d9be8b4b1dbf0c5e7b75be77923d87",
        },
        TagVector {
            name: "sensors at the last 32-bit value",
            key: "revocable-key-2",
            envelope: r#"{"sense":{"temperature":21.5},"serial":"fake-0-0002","firmware":"v1.2.3","hardware":"v0.1.0","timestamp":"2024-06-30T12:34:56.789Z","value":4294967295}"#,
            signing_form: r#"{"sense":{"temperature":21.5},"serial":"fake-0-0002","firmware":"v1.2.3","hardware":"v0.1.0","timestamp":"2024-06-30T12:34:56.789Z","value":4294967295,"tag":"0"}"#,
            expected_tag: "0ee21eb9fd48592b6cd867f447effda297cb99bf045fd2cf9b0ad99be1c35182",
        },
        TagVector {
            name: "integral and small floats in JavaScript form",
            key: "revocable-key-1",
            envelope: r#"{"state":{"t":21.0,"v":5e-6},"serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":9}"#,
            signing_form: r#"{"state":{"t":21,"v":0.000005},"serial":"fake-0-0001","firmware":"v0.0.0","hardware":"v0.0.0","timestamp":"2024-01-01T00:00:00.000Z","value":9,"tag":"0"}"#,
            expected_tag: "febca5fad57862b400b7ab2fc764a419302add5b4dfb15e2d8151c3139eb7cc9",
        },
        TagVector {
            name: "exponent floats in JavaScript form",
            key: "revocable-key-2",
            envelope: r#"{"sense":{"energy":1e21,"drift":0.0000001,"ratio":-0.25},"serial":"fake-0-0002","firmware":"v1.2.3","hardware":"v0.1.0","timestamp":"2024-06-30T12:34:56.789Z","value":12}"#,
            signing_form: r#"{"sense":{"energy":1e+21,"drift":1e-7,"ratio":-0.25},"serial":"fake-0-0002","firmware":"v1.2.3","hardware":"v0.1.0","timestamp":"2024-06-30T12:34:56.789Z","value":12,"tag":"0"}"#,
            expected_tag: "44d865067bc5ddeb10d5c8acacd93091fb79af3c483e3aaafb8fd29425e0f9c1",
        },
    ]
}

/// Check every vector; returns the names of the ones that fail.
pub fn verify_all_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|vector| {
            let envelope = vector.parse();
            let form_ok = signing_bytes(&envelope) == vector.signing_form.as_bytes();
            let tag_ok = sign(&envelope, &vector.shared_key()).as_str() == vector.expected_tag;
            !(form_ok && tag_ok)
        })
        .map(|vector| vector.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polip_core::EnvelopeCodec;

    #[test]
    fn test_all_vectors_verify() {
        let failures = verify_all_vectors();
        assert!(failures.is_empty(), "failing vectors: {:?}", failures);
    }

    #[test]
    fn test_sealed_vectors_verify_and_keep_field_order() {
        for vector in all_vectors() {
            let key = vector.shared_key();
            let codec = EnvelopeCodec::new(&key, false);
            let mut envelope = vector.parse();
            codec.seal(&mut envelope);

            assert!(codec.verify(&envelope), "{}", vector.name);
            let wire = envelope.to_canonical_string();
            let expected = vector
                .signing_form
                .replace(r#""tag":"0""#, &format!(r#""tag":"{}""#, vector.expected_tag));
            assert_eq!(wire, expected, "{}", vector.name);
        }
    }

    #[test]
    fn test_vectors_reject_other_keys() {
        for vector in all_vectors() {
            let mut envelope = vector.parse();
            EnvelopeCodec::new(&vector.shared_key(), false).seal(&mut envelope);
            let wrong = SharedKey::new("revocable-key-9");
            assert!(!EnvelopeCodec::new(&wrong, false).verify(&envelope));
        }
    }
}
