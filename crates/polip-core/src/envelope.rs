//! Envelope: the request/response message exchanged with the ingest service.
//!
//! An envelope is an ordered JSON object. Key order is insertion order, and
//! the same compact serialization is used both for computing the tag and
//! for the bytes put on the wire.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::format;
use crate::identity::DeviceIdentity;
use crate::types::Tag;

/// Protocol field names.
pub mod fields {
    pub const SERIAL: &str = "serial";
    pub const FIRMWARE: &str = "firmware";
    pub const HARDWARE: &str = "hardware";
    pub const TIMESTAMP: &str = "timestamp";
    pub const VALUE: &str = "value";
    pub const TAG: &str = "tag";
}

/// A protocol envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Create an empty envelope.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an existing JSON object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Wrap a JSON value, if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Insert a field. Existing keys keep their position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The raw `tag` field, if it is a string.
    pub fn tag(&self) -> Option<&str> {
        self.0.get(fields::TAG).and_then(Value::as_str)
    }

    /// Set the `tag` field.
    pub fn set_tag(&mut self, tag: &Tag) {
        self.insert(fields::TAG, tag.as_str());
    }

    /// The `value` counter field, if it is a non-negative integer.
    pub fn value(&self) -> Option<u64> {
        self.0.get(fields::VALUE).and_then(Value::as_u64)
    }

    pub fn serial(&self) -> Option<&str> {
        self.0.get(fields::SERIAL).and_then(Value::as_str)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.0.get(fields::TIMESTAMP).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Compact JSON text, exactly as transmitted.
    pub fn to_canonical_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = format::to_compact_vec(&self.0).map_err(|_| fmt::Error)?;
        f.write_str(std::str::from_utf8(&bytes).map_err(|_| fmt::Error)?)
    }
}

impl From<Map<String, Value>> for Envelope {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Builder for request envelopes.
///
/// Fields land in the order payload, identity, timestamp, value. The tag
/// is appended last by the codec.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeBuilder {
    fields: Map<String, Value>,
}

impl EnvelopeBuilder {
    /// Start from operation payload fields.
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { fields: payload }
    }

    /// Add the device's identity fields.
    pub fn identity(mut self, identity: &DeviceIdentity) -> Self {
        self.fields
            .insert(fields::SERIAL.into(), identity.serial().into());
        self.fields
            .insert(fields::FIRMWARE.into(), identity.firmware().into());
        self.fields
            .insert(fields::HARDWARE.into(), identity.hardware().into());
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.fields
            .insert(fields::TIMESTAMP.into(), Value::String(timestamp.into()));
        self
    }

    /// Attach the sequence counter value.
    pub fn value(mut self, value: u64) -> Self {
        self.fields.insert(fields::VALUE.into(), value.into());
        self
    }

    pub fn build(self) -> Envelope {
        Envelope(self.fields)
    }
}

/// Current UTC time as ISO-8601 with millisecond precision, e.g.
/// `2024-01-01T00:00:00.000Z`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new(
            "https://ingest.test",
            "fake-0-0001",
            "revocable-key-1",
            "v0.0.0",
            "v0.0.0",
        )
    }

    #[test]
    fn test_builder_field_order() {
        let mut payload = Map::new();
        payload.insert("state".into(), json!({"power": false}));

        let envelope = EnvelopeBuilder::new(payload)
            .identity(&identity())
            .timestamp("2024-01-01T00:00:00.000Z")
            .value(7)
            .build();

        let keys: Vec<&str> = envelope.as_map().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["state", "serial", "firmware", "hardware", "timestamp", "value"]
        );
        assert_eq!(envelope.value(), Some(7));
        assert_eq!(envelope.serial(), Some("fake-0-0001"));
    }

    #[test]
    fn test_set_tag_keeps_position() {
        let mut envelope = Envelope::from_value(json!({"tag": "0", "a": 1})).unwrap();
        envelope.set_tag(&Tag::from_digest([0xab; 32]));
        assert_eq!(envelope.as_map().keys().next().map(String::as_str), Some("tag"));
        assert_eq!(envelope.tag(), Some("ab".repeat(32).as_str()));
    }

    #[test]
    fn test_canonical_string_is_compact_json() {
        let envelope =
            Envelope::from_value(json!({"serial": 1, "data": "x/y", "tag": "0"})).unwrap();
        assert_eq!(
            envelope.to_canonical_string(),
            r#"{"serial":1,"data":"x/y","tag":"0"}"#
        );
    }

    #[test]
    fn test_canonical_string_writes_numbers_like_javascript() {
        let envelope =
            Envelope::from_value(json!({"state": {"t": 21.0, "v": 0.000005}, "big": 1e21}))
                .unwrap();
        assert_eq!(
            envelope.to_canonical_string(),
            r#"{"state":{"t":21,"v":0.000005},"big":1e+21}"#
        );
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(Envelope::from_value(json!("value invalid")).is_none());
        assert!(Envelope::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_timestamp_format() {
        let ts = timestamp_now();
        assert_eq!(ts.len(), "2024-01-01T00:00:00.000Z".len());
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
