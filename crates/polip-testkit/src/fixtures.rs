//! Test fixtures and helpers.
//!
//! [`MemoryIngest`] stands in for the ingest service: it checks tags and
//! counters the way the real service does and answers with signed acks.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use polip_client::{
    Transport, TransportError, TransportResponse, HEALTH_PATH, VALUE_INVALID_BODY, VALUE_PATH,
};
use polip_core::{fields, DeviceIdentity, Envelope, EnvelopeCodec, SequenceState, SharedKey};
use serde_json::{Map, Value};

pub const TEST_URL: &str = "https://ingest.test";
pub const TEST_SERIAL: &str = "fake-0-0001";
pub const TEST_KEY: &str = "revocable-key-1";
pub const TEST_VERSION: &str = "v0.0.0";

/// Body the simulated service sends for a bad tag.
pub const TAG_INVALID_BODY: &str = "tag invalid";

/// Identity matching [`MemoryIngest::new`]'s defaults.
pub fn test_identity() -> DeviceIdentity {
    DeviceIdentity::new(TEST_URL, TEST_SERIAL, TEST_KEY, TEST_VERSION, TEST_VERSION)
}

/// A 200 response carrying `fields` sealed with `key`.
pub fn signed_ack(key: &SharedKey, fields: Map<String, Value>) -> TransportResponse {
    let mut ack = Envelope::from_map(fields);
    EnvelopeCodec::new(key, false).seal(&mut ack);
    TransportResponse::ok(ack.into_value())
}

struct Server {
    counter: SequenceState,
    online: bool,
    failing_probes: usize,
    tamper_acks: bool,
    responses: HashMap<String, Map<String, Value>>,
    accepted: Vec<(String, Envelope)>,
    rejected: usize,
}

/// Simulated ingest service for one device.
///
/// Every signed POST must carry a valid tag and the counter value the
/// service expects; accepted requests advance the service's counter.
pub struct MemoryIngest {
    base_url: String,
    serial: String,
    key: SharedKey,
    skip_tag_check: bool,
    server: Mutex<Server>,
}

impl MemoryIngest {
    /// Service for [`test_identity`] with its counter at zero.
    pub fn new() -> Self {
        Self::for_device(&test_identity(), SequenceState::unbounded(0))
    }

    /// Service for any identity, expecting `counter` next.
    pub fn for_device(identity: &DeviceIdentity, counter: SequenceState) -> Self {
        Self {
            base_url: identity.base_url().trim_end_matches('/').to_string(),
            serial: identity.serial().to_string(),
            key: identity.key().clone(),
            skip_tag_check: identity.skip_tag_check(),
            server: Mutex::new(Server {
                counter,
                online: true,
                failing_probes: 0,
                tamper_acks: false,
                responses: HashMap::new(),
                accepted: Vec::new(),
                rejected: 0,
            }),
        }
    }

    /// The value the service expects next.
    pub fn server_value(&self) -> u64 {
        self.server().counter.value()
    }

    /// Move the service's counter, e.g. to simulate another client.
    pub fn set_server_value(&self, value: u64) {
        let mut server = self.server();
        server.counter = server.counter.resync(value);
    }

    /// Take the service offline or bring it back.
    pub fn set_online(&self, online: bool) {
        self.server().online = online;
    }

    /// Fail the next `n` health probes.
    pub fn fail_probes(&self, n: usize) {
        self.server().failing_probes = n;
    }

    /// Corrupt the tag of every ack from now on.
    pub fn tamper_acks(&self, tamper: bool) {
        self.server().tamper_acks = tamper;
    }

    /// Extra fields for acks of `path` (without query string).
    pub fn respond_with(&self, path: &str, fields: Map<String, Value>) {
        self.server().responses.insert(path.to_string(), fields);
    }

    /// Accepted requests as (path, envelope), oldest first.
    pub fn accepted(&self) -> Vec<(String, Envelope)> {
        self.server().accepted.clone()
    }

    /// Requests turned away for a bad tag or counter.
    pub fn rejected(&self) -> usize {
        self.server().rejected
    }

    fn server(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn path_of<'u>(&self, url: &'u str) -> Option<&'u str> {
        let rest = url.strip_prefix(self.base_url.as_str())?;
        Some(rest.split('?').next().unwrap_or(rest))
    }

    fn ack(&self, server: &Server, path: &str, value: u64) -> TransportResponse {
        let mut ack = Map::new();
        if let Some(extra) = server.responses.get(path) {
            ack.extend(extra.clone());
        }
        ack.insert(fields::SERIAL.into(), Value::from(self.serial.as_str()));
        ack.insert(fields::VALUE.into(), Value::from(value));

        if self.skip_tag_check {
            return TransportResponse::ok(Value::Object(ack));
        }

        let response = signed_ack(&self.key, ack);
        if !server.tamper_acks {
            return response;
        }
        let mut body = response.body;
        if let Some(map) = body.as_object_mut() {
            map.insert(fields::TAG.into(), Value::from("0".repeat(64)));
        }
        TransportResponse::ok(body)
    }
}

impl Default for MemoryIngest {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryIngest {
    async fn get(&self, url: &str) -> polip_client::transport::Result<TransportResponse> {
        let mut server = self.server();
        if !server.online {
            return Err(TransportError::Unreachable(url.to_string()));
        }
        if server.failing_probes > 0 {
            server.failing_probes -= 1;
            return Ok(TransportResponse::new(503, "starting"));
        }
        match self.path_of(url) {
            Some(HEALTH_PATH) => Ok(TransportResponse::ok(Value::from("ok"))),
            _ => Ok(TransportResponse::new(404, "not found")),
        }
    }

    async fn post(
        &self,
        url: &str,
        envelope: &Envelope,
    ) -> polip_client::transport::Result<TransportResponse> {
        let mut server = self.server();
        if !server.online {
            return Err(TransportError::Unreachable(url.to_string()));
        }
        let Some(path) = self.path_of(url) else {
            return Ok(TransportResponse::new(404, "not found"));
        };

        if path == VALUE_PATH {
            let mut ack = Map::new();
            ack.insert(fields::SERIAL.into(), Value::from(self.serial.as_str()));
            ack.insert(fields::VALUE.into(), Value::from(server.counter.value()));
            return Ok(TransportResponse::ok(Value::Object(ack)));
        }

        // The body on the wire must be what the device tagged.
        let wire: Envelope = match serde_json::from_str(&envelope.to_canonical_string()) {
            Ok(wire) => wire,
            Err(_) => return Ok(TransportResponse::new(400, "bad json")),
        };

        let codec = EnvelopeCodec::new(&self.key, self.skip_tag_check);
        if !codec.verify(&wire) {
            server.rejected += 1;
            tracing::debug!(path, "simulated ingest rejected tag");
            return Ok(TransportResponse::new(401, TAG_INVALID_BODY));
        }
        if wire.value() != Some(server.counter.value()) {
            server.rejected += 1;
            tracing::debug!(
                path,
                expected = server.counter.value(),
                got = ?wire.value(),
                "simulated ingest rejected value"
            );
            return Ok(TransportResponse::new(500, VALUE_INVALID_BODY));
        }

        let value = server.counter.value();
        server.counter = server.counter.advance();
        server.accepted.push((path.to_string(), wire));
        Ok(self.ack(&server, path, value))
    }
}
