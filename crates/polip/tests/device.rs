//! End-to-end device behavior against a simulated ingest service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use polip::client::{BootstrapConfig, ScriptedTransport, TransportError, TransportResponse};
use polip::core::{SequenceState, SharedKey};
use polip::{DeviceConfig, DeviceError, GetStateParams, PolipDevice, RpcResult, RpcStatus};
use polip_testkit::fixtures::{
    signed_ack, MemoryIngest, TEST_KEY, TEST_SERIAL, TEST_URL, TEST_VERSION,
};
use serde_json::{json, Map, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn config() -> DeviceConfig {
    DeviceConfig::new(TEST_SERIAL, TEST_KEY, TEST_VERSION, TEST_VERSION).with_url(TEST_URL)
}

fn device_with(ingest: &Arc<MemoryIngest>) -> PolipDevice<Arc<MemoryIngest>> {
    PolipDevice::new(config(), Arc::clone(ingest)).unwrap()
}

fn ack(value: u64) -> Result<TransportResponse, TransportError> {
    let mut fields = Map::new();
    fields.insert("serial".into(), Value::from(TEST_SERIAL));
    fields.insert("value".into(), Value::from(value));
    Ok(signed_ack(&SharedKey::new(TEST_KEY), fields))
}

fn value_invalid() -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse::new(500, "value invalid"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Round trips
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_push_state_round_trip() {
    init_tracing();
    let ingest = Arc::new(MemoryIngest::new());
    let device = device_with(&ingest);

    let response = device.push_state(json!({"power": true})).await.unwrap();

    assert_eq!(response.value(), Some(0));
    assert_eq!(device.value().await, 1);
    assert_eq!(ingest.server_value(), 1);

    let accepted = ingest.accepted();
    assert_eq!(accepted.len(), 1);
    let (path, envelope) = &accepted[0];
    assert_eq!(path, "/api/v1/device/push");
    let keys: Vec<&str> = envelope.as_map().keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        ["state", "serial", "firmware", "hardware", "timestamp", "value", "tag"]
    );
    assert_eq!(envelope.get("state"), Some(&json!({"power": true})));
}

#[tokio::test]
async fn test_every_endpoint_advances_the_counter() {
    let ingest = Arc::new(MemoryIngest::new());
    let device = device_with(&ingest);

    device.get_state(GetStateParams::default()).await.unwrap();
    device.push_state(json!({})).await.unwrap();
    device.push_notification("Hello World").await.unwrap();
    device.push_error("overheated", 7).await.unwrap();
    device.push_sensors(json!({"temperature": 21})).await.unwrap();
    device
        .push_rpc(&RpcResult::new("abc-123", "done").with_status(RpcStatus::Success))
        .await
        .unwrap();
    device.get_schema().await.unwrap();
    device.get_error_semantic(None).await.unwrap();
    device.get_error_semantic(Some(7)).await.unwrap();

    assert_eq!(device.value().await, 9);
    let paths: Vec<String> = ingest.accepted().into_iter().map(|(p, _)| p).collect();
    assert_eq!(
        paths,
        [
            "/api/v1/device/poll",
            "/api/v1/device/push",
            "/api/v1/device/error",
            "/api/v1/device/error",
            "/api/v1/device/sense",
            "/api/v1/device/rpc",
            "/api/v1/device/schema",
            "/api/v1/device/error/semantic",
            "/api/v1/device/error/semantic",
        ]
    );

    let accepted = ingest.accepted();
    let notification = &accepted[2].1;
    assert_eq!(notification.get("code"), Some(&json!(0)));
    assert_eq!(notification.get("message"), Some(&json!("Hello World")));

    let rpc = &accepted[5].1;
    assert_eq!(
        rpc.get("rpc"),
        Some(&json!({"uuid": "abc-123", "result": "done", "status": "success"}))
    );
}

#[tokio::test]
async fn test_query_strings_reach_the_transport() {
    let transport = ScriptedTransport::new();
    transport.push_post(ack(0));
    transport.push_post(ack(1));
    transport.push_post(ack(2));
    let device = PolipDevice::new(config(), transport).unwrap();

    device
        .get_state(GetStateParams {
            meta: true,
            ..Default::default()
        })
        .await
        .unwrap();
    device.get_error_semantic(Some(4)).await.unwrap();
    device.get_error_semantic(None).await.unwrap();

    let urls: Vec<String> = device
        .session()
        .transport()
        .requests()
        .into_iter()
        .map(|r| r.url)
        .collect();
    assert_eq!(
        urls,
        [
            "https://ingest.test/api/v1/device/poll?meta=true&state=true&sensors=false&rpc=false&manufacturer=false",
            "https://ingest.test/api/v1/device/error/semantic?code=4",
            "https://ingest.test/api/v1/device/error/semantic",
        ]
    );
}

#[tokio::test]
async fn test_poll_returns_server_fields() {
    let ingest = Arc::new(MemoryIngest::new());
    let mut extra = Map::new();
    extra.insert("state".into(), json!({"power": false}));
    ingest.respond_with("/api/v1/device/poll", extra);
    let device = device_with(&ingest);

    let response = device.get_state(GetStateParams::default()).await.unwrap();
    assert_eq!(response.get("state"), Some(&json!({"power": false})));
}

#[tokio::test]
async fn test_rollover_wraps_to_zero() {
    let config = config().with_rollover(3).with_value(2);
    let ingest = Arc::new(MemoryIngest::for_device(
        &config.identity(),
        SequenceState::new(2, Some(3)).unwrap(),
    ));
    let device = PolipDevice::new(config, Arc::clone(&ingest)).unwrap();

    device.push_state(json!({})).await.unwrap();
    assert_eq!(device.value().await, 0);
    device.push_state(json!({})).await.unwrap();
    assert_eq!(device.value().await, 1);

    let values: Vec<Option<u64>> = ingest.accepted().iter().map(|(_, e)| e.value()).collect();
    assert_eq!(values, [Some(2), Some(0)]);
}

#[tokio::test]
async fn test_concurrent_operations_use_distinct_values() {
    let ingest = Arc::new(MemoryIngest::new());
    let device = device_with(&ingest);

    let (a, b, c, d) = tokio::join!(
        device.push_state(json!({"n": 1})),
        device.push_state(json!({"n": 2})),
        device.push_sensors(json!({"n": 3})),
        device.push_notification("n"),
    );
    for result in [a, b, c, d] {
        result.unwrap();
    }

    let mut values: Vec<u64> = ingest
        .accepted()
        .iter()
        .filter_map(|(_, e)| e.value())
        .collect();
    values.sort_unstable();
    assert_eq!(values, [0, 1, 2, 3]);
    assert_eq!(ingest.rejected(), 0);
    assert_eq!(device.value().await, 4);
}

#[tokio::test]
async fn test_skip_tag_check_sends_sentinel() {
    let config = config().with_skip_tag_check(true);
    let ingest = Arc::new(MemoryIngest::for_device(
        &config.identity(),
        SequenceState::unbounded(0),
    ));
    let device = PolipDevice::new(config, Arc::clone(&ingest)).unwrap();

    let response = device.push_state(json!({})).await.unwrap();
    assert_eq!(response.tag(), None);
    assert_eq!(ingest.accepted()[0].1.tag(), Some("0"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Failures and recovery
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_desync_recovered_by_resync() {
    init_tracing();
    let ingest = Arc::new(MemoryIngest::new());
    ingest.set_server_value(10);
    let device = device_with(&ingest);

    let err = device.push_state(json!({})).await.unwrap_err();
    assert!(err.is_value_desync());
    assert_eq!(device.value().await, 0);

    let response = device
        .with_resync("push_state", |d| d.push_state(json!({"power": true})))
        .await
        .unwrap();

    assert_eq!(response.value(), Some(10));
    assert_eq!(device.value().await, 11);
    assert_eq!(ingest.server_value(), 11);
    assert_eq!(ingest.rejected(), 2);
}

#[tokio::test]
async fn test_persistent_desync_exhausts() {
    let transport = ScriptedTransport::new();
    transport.push_post(value_invalid());
    transport.push_post(Ok(TransportResponse::ok(
        json!({"serial": TEST_SERIAL, "value": 3}),
    )));
    transport.push_post(value_invalid());
    let device = PolipDevice::new(config(), transport).unwrap();

    let err = device
        .with_resync("push_state", |d| d.push_state(json!({})))
        .await
        .unwrap_err();

    assert!(err.is_retries_exhausted());
    assert_eq!(device.session().transport().post_count(), 3);
    assert_eq!(device.value().await, 3);
}

#[tokio::test]
async fn test_tampered_ack_is_integrity_error() {
    let ingest = Arc::new(MemoryIngest::new());
    ingest.tamper_acks(true);
    let device = device_with(&ingest);

    let err = device
        .with_resync("push_state", |d| d.push_state(json!({})))
        .await
        .unwrap_err();

    assert!(err.is_integrity());
    assert_eq!(device.value().await, 0);
    assert_eq!(ingest.accepted().len(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let transport = ScriptedTransport::new();
    transport.push_post(Ok(TransportResponse::new(503, json!({"error": "busy"}))));
    let device = PolipDevice::new(config(), transport).unwrap();

    let err = device
        .with_resync("push_state", |d| d.push_state(json!({})))
        .await
        .unwrap_err();

    match err {
        DeviceError::Protocol(polip::client::ProtocolError::Server {
            operation,
            endpoint,
            status,
            body,
        }) => {
            assert_eq!(operation, "push_state");
            assert_eq!(endpoint, "/api/v1/device/push");
            assert_eq!(status, 503);
            assert_eq!(body, json!({"error": "busy"}));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(device.session().transport().post_count(), 1);
}

#[tokio::test]
async fn test_unreachable_server_is_communication_error() {
    let ingest = Arc::new(MemoryIngest::new());
    ingest.set_online(false);
    let device = device_with(&ingest);

    let err = device.push_state(json!({})).await.unwrap_err();
    assert!(matches!(
        err.as_protocol(),
        Some(polip::client::ProtocolError::Communication { .. })
    ));
    assert!(!device.check_server_status().await);
}

// ─────────────────────────────────────────────────────────────────────────────
// Bootstrap
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_await_server_ok_after_failed_probes() {
    let ingest = Arc::new(MemoryIngest::new());
    ingest.fail_probes(3);
    let device = device_with(&ingest);
    let connected = AtomicBool::new(false);

    device
        .await_server_ok(
            &BootstrapConfig::default(),
            Some(|| connected.store(true, Ordering::SeqCst)),
        )
        .await
        .unwrap();

    assert!(connected.load(Ordering::SeqCst));
    assert!(device.check_server_status().await);
}

#[tokio::test(start_paused = true)]
async fn test_await_server_ok_gives_up() {
    let ingest = Arc::new(MemoryIngest::new());
    ingest.set_online(false);
    let device = device_with(&ingest);

    let config = BootstrapConfig::default()
        .with_max_retries(2)
        .with_recheck_period(Duration::from_millis(10));
    let err = device
        .await_server_ok(&config, None::<fn()>)
        .await
        .unwrap_err();

    assert!(err.is_retries_exhausted());
}

// ─────────────────────────────────────────────────────────────────────────────
// Persistence
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_restart_from_exported_state() {
    let ingest = Arc::new(MemoryIngest::new());
    let device = device_with(&ingest);
    device.push_state(json!({})).await.unwrap();
    device.push_state(json!({})).await.unwrap();

    let saved = serde_json::to_string(&device.export_state().await).unwrap();
    drop(device);

    let state = serde_json::from_str(&saved).unwrap();
    let restarted = PolipDevice::from_state(state, Arc::clone(&ingest)).unwrap();
    assert_eq!(restarted.value().await, 2);

    restarted.push_state(json!({})).await.unwrap();
    assert_eq!(ingest.rejected(), 0);
    assert_eq!(ingest.server_value(), 3);
}

#[tokio::test]
async fn test_export_state_fields() {
    let ingest = Arc::new(MemoryIngest::new());
    let device = PolipDevice::new(config().with_rollover(1 << 32), Arc::clone(&ingest)).unwrap();

    let exported = serde_json::to_value(device.export_state().await).unwrap();
    assert_eq!(
        exported,
        json!({
            "serial": TEST_SERIAL,
            "key": TEST_KEY,
            "hardware": TEST_VERSION,
            "firmware": TEST_VERSION,
            "rollover": 4294967296u64,
            "url": TEST_URL,
            "value": 0,
            "skipTagCheck": false,
        })
    );
}
