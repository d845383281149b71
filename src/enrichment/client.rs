//! Enrichment client: the contract for one remote domain service
//!
//! Each domain owns its own client. One `send_batch` call carries every
//! sub-request of a pass; the response preserves request order.
//! Two implementations:
//! - `HttpEnrichmentClient`: posts to the service's `$batch` endpoint (production)
//! - `MockEnrichmentClient`: answers from preconfigured entities (testing)

use super::batch::BatchRequest;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Body of a `$batch` call.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEnvelope<'a> {
    pub requests: &'a [BatchRequest],
}

/// Decoded `$batch` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default, deserialize_with = "lenient_entries")]
    pub responses: Vec<BatchResponseEntry>,
}

/// Decode each entry on its own; one that is not an object becomes an empty
/// entry and keeps its position.
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<BatchResponseEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|entry| serde_json::from_value(entry).unwrap_or_default())
        .collect())
}

/// One sub-response. Every field is optional; a malformed entry simply has
/// no payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchResponseEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl BatchResponseEntry {
    /// Entry carrying `value` as its payload.
    pub fn with_value(id: impl Into<String>, value: Value) -> Self {
        Self {
            id: Some(Value::String(id.into())),
            status: Some(Value::from(200)),
            body: Some(serde_json::json!({ "value": value })),
        }
    }

    /// Entry without a payload (e.g. the entity was not found).
    pub fn empty(id: impl Into<String>, status: u16) -> Self {
        Self {
            id: Some(Value::String(id.into())),
            status: Some(Value::from(status)),
            body: None,
        }
    }

    /// Correlation id echoed by the remote, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        self.id.as_ref().and_then(Value::as_str)
    }

    /// The entity payload at `body.value`, when it is an object.
    pub fn payload(&self) -> Option<&Map<String, Value>> {
        self.body
            .as_ref()?
            .get("value")?
            .as_object()
            .filter(|m| !m.is_empty())
    }
}

/// Errors from a whole batch call.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response decode error: {0}")]
    Decode(String),
    #[error("batch call timed out after {0:?}")]
    Timeout(Duration),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Client for one external domain's multiplexed batch endpoint.
#[async_trait]
pub trait EnrichmentClient: Send + Sync {
    /// Send every request in one call. `responses[k]` answers `requests[k]`.
    async fn send_batch(&self, requests: &[BatchRequest]) -> Result<BatchResponse, EnrichmentError>;
}

/// Mock client for testing. Answers from preconfigured entities.
///
/// Requests are matched on their foreign id; unknown ids get an entry
/// without a payload. Every call is recorded.
#[derive(Default)]
pub struct MockEnrichmentClient {
    entities: HashMap<String, Value>,
    failure: Option<String>,
    delay: Option<Duration>,
    reverse: bool,
    calls: Mutex<Vec<Vec<BatchRequest>>>,
}

impl MockEnrichmentClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every batch call fails.
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Register the payload returned for a foreign id.
    pub fn with_entity(mut self, foreign_id: impl Into<String>, value: Value) -> Self {
        self.entities.insert(foreign_id.into(), value);
        self
    }

    /// Wait before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer in reverse request order (entries still carry their ids).
    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    /// Requests received, one entry per batch call.
    pub fn calls(&self) -> Vec<Vec<BatchRequest>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

#[async_trait]
impl EnrichmentClient for MockEnrichmentClient {
    async fn send_batch(
        &self,
        requests: &[BatchRequest],
    ) -> Result<BatchResponse, EnrichmentError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(requests.to_vec());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = &self.failure {
            return Err(EnrichmentError::Unavailable(reason.clone()));
        }

        let mut responses: Vec<_> = requests
            .iter()
            .map(|r| match self.entities.get(&r.foreign_id) {
                Some(value) => BatchResponseEntry::with_value(&r.id, value.clone()),
                None => BatchResponseEntry::empty(&r.id, 404),
            })
            .collect();
        if self.reverse {
            responses.reverse();
        }

        Ok(BatchResponse { responses })
    }
}

/// Helper to build a remote entity payload for testing.
pub fn mock_entity(id: &str, display_id: &str, name_field: &str, name: &str) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(id.to_string()));
    map.insert("displayId".into(), Value::String(display_id.to_string()));
    map.insert(name_field.into(), Value::String(name.to_string()));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_requires_object_value() {
        let ok = BatchResponseEntry::with_value("a_0", json!({"id": "A"}));
        assert!(ok.payload().is_some());

        let scalar = BatchResponseEntry {
            body: Some(json!({"value": "A"})),
            ..Default::default()
        };
        assert!(scalar.payload().is_none());

        let missing = BatchResponseEntry::empty("a_1", 404);
        assert!(missing.payload().is_none());
    }

    #[test]
    fn malformed_entries_still_decode() {
        let raw = json!({
            "responses": [
                {"id": 7, "status": "200", "body": {"value": {"id": "A"}}},
                {"body": "oops"},
                {}
            ]
        });
        let response: BatchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.responses.len(), 3);
        assert!(response.responses[0].payload().is_some());
        assert_eq!(response.responses[0].correlation_id(), None);
        assert!(response.responses[1].payload().is_none());
        assert!(response.responses[2].payload().is_none());
    }

    #[test]
    fn non_object_entries_keep_their_position() {
        let raw = json!({
            "responses": [
                null,
                {"id": "account_1", "body": {"value": {"id": "B"}}},
                "garbage",
                [1, 2]
            ]
        });
        let response: BatchResponse = serde_json::from_value(raw).unwrap();

        assert_eq!(response.responses.len(), 4);
        assert!(response.responses[0].payload().is_none());
        assert_eq!(response.responses[1].correlation_id(), Some("account_1"));
        assert!(response.responses[1].payload().is_some());
        assert!(response.responses[2].payload().is_none());
        assert!(response.responses[3].payload().is_none());

        let null_list: BatchResponse = serde_json::from_value(json!({"responses": null})).unwrap();
        assert!(null_list.responses.is_empty());
    }

    #[tokio::test]
    async fn mock_answers_known_entities_in_order() {
        let client = MockEnrichmentClient::new()
            .with_entity("A", mock_entity("A", "1001", "formattedName", "Acme"));

        let requests = vec![
            BatchRequest::get("account_0", "/a/A", "A"),
            BatchRequest::get("account_1", "/a/B", "B"),
        ];
        let response = client.send_batch(&requests).await.unwrap();

        assert_eq!(response.responses.len(), 2);
        assert!(response.responses[0].payload().is_some());
        assert!(response.responses[1].payload().is_none());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn failing_mock_returns_error() {
        let client = MockEnrichmentClient::failing("down");
        let err = client.send_batch(&[]).await.unwrap_err();
        assert!(matches!(err, EnrichmentError::Unavailable(_)));
    }
}
