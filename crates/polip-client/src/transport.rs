//! Transport port for the device protocol.
//!
//! The transport moves envelopes to the ingest service and hands back
//! status and body. Implementations may use any HTTP client; TLS,
//! connection pooling and socket-level retries are their business.

use std::sync::Arc;

use async_trait::async_trait;
use polip_core::Envelope;
use serde_json::Value;

use crate::error::TransportError;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Status and decoded body of a server response.
///
/// Bodies that are not JSON (such as a bare `value invalid` text body)
/// should be passed through as [`Value::String`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Value>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A 200 response.
    pub fn ok(body: impl Into<Value>) -> Self {
        Self::new(200, body)
    }

    /// Whether the server accepted the request.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Transport trait for talking to the ingest service.
///
/// Implementations must be thread-safe (Send + Sync). An `Err` means no
/// response was received; any response, whatever its status, is `Ok`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a URL.
    async fn get(&self, url: &str) -> Result<TransportResponse>;

    /// POST an envelope to a URL.
    ///
    /// The request body must be exactly [`Envelope::to_canonical_string`]:
    /// the tag was computed over that serialization.
    async fn post(&self, url: &str, envelope: &Envelope) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> Result<TransportResponse> {
        (**self).get(url).await
    }

    async fn post(&self, url: &str, envelope: &Envelope) -> Result<TransportResponse> {
        (**self).post(url, envelope).await
    }
}

/// A scripted in-memory transport for testing.
///
/// Responses are queued per method and handed out in order; every request
/// is recorded with its wire body. An empty queue behaves like an
/// unreachable server.
pub mod memory {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    /// HTTP method of a recorded request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Method {
        Get,
        Post,
    }

    /// A request seen by the transport.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedRequest {
        pub method: Method,
        pub url: String,
        /// Wire body for POST requests.
        pub body: Option<String>,
    }

    impl RecordedRequest {
        /// The posted body parsed back into an envelope.
        pub fn envelope(&self) -> Option<Envelope> {
            let body = self.body.as_deref()?;
            serde_json::from_str(body).ok()
        }
    }

    #[derive(Default)]
    struct Script {
        gets: VecDeque<Result<TransportResponse>>,
        posts: VecDeque<Result<TransportResponse>>,
        requests: Vec<RecordedRequest>,
    }

    /// In-memory transport replaying queued responses.
    #[derive(Default)]
    pub struct ScriptedTransport {
        script: Mutex<Script>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the outcome of the next unanswered GET.
        pub fn push_get(&self, outcome: Result<TransportResponse>) {
            self.script().gets.push_back(outcome);
        }

        /// Queue the outcome of the next unanswered POST.
        pub fn push_post(&self, outcome: Result<TransportResponse>) {
            self.script().posts.push_back(outcome);
        }

        /// All requests seen so far, oldest first.
        pub fn requests(&self) -> Vec<RecordedRequest> {
            self.script().requests.clone()
        }

        pub fn post_count(&self) -> usize {
            self.count(Method::Post)
        }

        pub fn get_count(&self) -> usize {
            self.count(Method::Get)
        }

        fn count(&self, method: Method) -> usize {
            self.script()
                .requests
                .iter()
                .filter(|r| r.method == method)
                .count()
        }

        fn script(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<TransportResponse> {
            let mut script = self.script();
            script.requests.push(RecordedRequest {
                method: Method::Get,
                url: url.to_string(),
                body: None,
            });
            script
                .gets
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Unreachable("no scripted response".into())))
        }

        async fn post(&self, url: &str, envelope: &Envelope) -> Result<TransportResponse> {
            let mut script = self.script();
            script.requests.push(RecordedRequest {
                method: Method::Post,
                url: url.to_string(),
                body: Some(envelope.to_canonical_string()),
            });
            script
                .posts
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Unreachable("no scripted response".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::{Method, ScriptedTransport};
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::new();
        transport.push_post(Ok(TransportResponse::ok(json!({"n": 1}))));
        transport.push_post(Ok(TransportResponse::new(500, "boom")));

        let envelope = Envelope::from_value(json!({"serial": "s"})).unwrap();
        let first = transport.post("http://x/a", &envelope).await.unwrap();
        let second = transport.post("http://x/b", &envelope).await.unwrap();
        assert!(first.is_ok());
        assert_eq!(second.status, 500);

        // queue exhausted
        assert!(matches!(
            transport.post("http://x/c", &envelope).await,
            Err(TransportError::Unreachable(_))
        ));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"serial":"s"}"#));
        assert_eq!(requests[0].envelope(), Some(envelope));
    }

    #[tokio::test]
    async fn test_arc_transport_delegates() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_get(Ok(TransportResponse::ok(Value::Null)));

        let shared: Arc<ScriptedTransport> = Arc::clone(&transport);
        assert!(shared.get("http://x/api/v1/").await.unwrap().is_ok());
        assert_eq!(transport.get_count(), 1);
    }
}
