//! Shared fixtures for the integration tests
//!
//! Builders for Sample records and remote payloads, plus wiremock helpers
//! for standing up fake domain services.

use sample_enrichment::Record;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A sample with optional references.
pub fn sample(
    id: &str,
    account: Option<&str>,
    product: Option<&str>,
    employee: Option<&str>,
) -> Record {
    let mut record = Record::new().with("ID", id).with("sampleName", format!("Sample {}", id));
    if let Some(a) = account {
        record.insert("account", json!({ "accountID": a }));
    }
    if let Some(p) = product {
        record.insert("product", json!({ "productID": p }));
    }
    if let Some(e) = employee {
        record.insert("employee", json!({ "employeeID": e }));
    }
    record
}

/// One `$batch` sub-response carrying an entity.
pub fn entry(
    correlation_id: &str,
    id: &str,
    display_id: &str,
    name_field: &str,
    name: &str,
) -> Value {
    let mut value = serde_json::Map::new();
    value.insert("id".into(), json!(id));
    value.insert("displayId".into(), json!(display_id));
    value.insert(name_field.into(), json!(name));
    json!({
        "id": correlation_id,
        "status": 200,
        "body": { "value": value }
    })
}

/// Mount a `$batch` handler answering with `responses`.
pub async fn mount_batch(server: &MockServer, responses: Vec<Value>, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/$batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responses": responses })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Mount a `$batch` handler that fails with `status`.
pub async fn mount_failing_batch(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/$batch"))
        .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
        .mount(server)
        .await;
}

/// Decoded JSON bodies of every request the server received.
pub async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter_map(|r| serde_json::from_slice(&r.body).ok())
        .collect()
}
