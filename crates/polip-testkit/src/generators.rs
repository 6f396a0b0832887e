//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use polip_core::{format_version, DeviceIdentity, Envelope, EnvelopeBuilder, SequenceState, SharedKey};

/// Generate a hex-encoded device key.
pub fn shared_key() -> impl Strategy<Value = SharedKey> {
    any::<[u8; 16]>().prop_map(|bytes| SharedKey::new(hex::encode(bytes)))
}

/// Generate a serial in the `fake-N-NNNN` shape.
pub fn serial() -> impl Strategy<Value = String> {
    (0u8..10, 0u16..10_000).prop_map(|(batch, n)| format!("fake-{}-{:04}", batch, n))
}

/// Generate a version string.
pub fn version() -> impl Strategy<Value = String> {
    (0u32..20, 0u32..20, 0u32..100).prop_map(|(major, minor, patch)| format_version(major, minor, patch))
}

/// Generate an ISO-8601 UTC timestamp with millisecond precision.
pub fn timestamp() -> impl Strategy<Value = String> {
    (2020u32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60, 0u32..1000).prop_map(
        |(y, mo, d, h, mi, s, ms)| format!("{y:04}-{mo:02}-{d:02}T{h:02}:{mi:02}:{s:02}.{ms:03}Z"),
    )
}

/// Generate a device identity with tag checks enabled.
pub fn identity() -> impl Strategy<Value = DeviceIdentity> {
    (serial(), shared_key(), version(), version()).prop_map(|(serial, key, hardware, firmware)| {
        DeviceIdentity::new("https://ingest.test", serial, key, hardware, firmware)
    })
}

/// Generate a counter that satisfies its rollover invariant.
pub fn sequence_state() -> impl Strategy<Value = SequenceState> {
    prop_oneof![
        any::<u64>().prop_map(SequenceState::unbounded),
        (1u64..=1 << 32).prop_flat_map(|rollover| {
            (0..rollover).prop_map(move |value| {
                SequenceState::new(value, Some(rollover)).expect("value below rollover")
            })
        }),
    ]
}

/// Generate an opaque JSON leaf.
pub fn json_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::from),
    ]
}

/// Generate an operation payload: a small object of opaque fields.
///
/// Keys never collide with the protocol fields.
pub fn payload() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec(("[a-z]{1,8}".prop_map(|k| format!("p_{k}")), json_leaf()), 0..6)
        .prop_map(|entries| entries.into_iter().collect())
}

/// Generate an untagged request envelope.
pub fn envelope() -> impl Strategy<Value = Envelope> {
    (payload(), identity(), timestamp(), any::<u64>()).prop_map(
        |(payload, identity, timestamp, value)| {
            EnvelopeBuilder::new(payload)
                .identity(&identity)
                .timestamp(timestamp)
                .value(value)
                .build()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use polip_core::{sign, EnvelopeCodec};

    proptest! {
        #[test]
        fn tag_is_deterministic(envelope in envelope(), key in shared_key()) {
            prop_assert_eq!(sign(&envelope, &key), sign(&envelope, &key));
        }

        #[test]
        fn sealed_envelope_survives_the_wire(mut envelope in envelope(), key in shared_key()) {
            let codec = EnvelopeCodec::new(&key, false);
            codec.seal(&mut envelope);

            let received: Envelope = serde_json::from_str(&envelope.to_canonical_string()).unwrap();
            prop_assert!(codec.verify(&received));
        }

        #[test]
        fn generated_counters_respect_rollover(state in sequence_state()) {
            if let Some(rollover) = state.rollover() {
                prop_assert!(state.value() < rollover);
                prop_assert!(state.advance().value() < rollover);
            }
        }

        #[test]
        fn identities_validate(identity in identity()) {
            prop_assert!(identity.validate().is_ok());
        }
    }
}
