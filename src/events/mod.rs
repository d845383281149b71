//! Domain-event notification for created Samples
//!
//! After a successful create the service posts a CloudEvents-style envelope
//! to a timeline sink. Delivery is fire-and-forget: a failure is logged and
//! never reaches the caller.

use crate::record::Record;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub const SPEC_VERSION: &str = "1.0";
pub const DEFAULT_EVENT_TYPE: &str = "sample.created";
pub const DEFAULT_EVENT_SOURCE: &str = "/samples";

/// Payload of a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(rename = "currentImage")]
    pub current_image: Value,
}

/// The event envelope posted to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: String,
    /// Id of the entity the event is about
    pub subject: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub specversion: String,
    pub source: String,
    pub time: String,
    pub datacontenttype: String,
    pub data: EventData,
}

impl DomainEvent {
    /// Envelope for a newly created record.
    pub fn created(record: &Record, event_type: &str, source: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject: record.id().unwrap_or_default().to_string(),
            event_type: event_type.to_string(),
            specversion: SPEC_VERSION.to_string(),
            source: source.to_string(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            datacontenttype: "application/json".to_string(),
            data: EventData {
                current_image: record.clone().into_value(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("event delivery failed: {0}")]
    Delivery(String),
    #[error("event sink returned status {0}")]
    Status(u16),
}

/// Sink for domain events.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError>;
}

/// Posts events as JSON to a single sink URL.
pub struct HttpEventNotifier {
    client: Client,
    url: String,
}

impl HttpEventNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Delivery(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventNotifier for HttpEventNotifier {
    async fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/cloudevents+json")
            .json(event)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(NotifyError::Status(response.status().as_u16()))
        }
    }
}

/// Notifier that records events in memory (testing).
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<DomainEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that records, then reports a delivery failure.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl EventNotifier for RecordingNotifier {
    async fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
        if self.fail {
            return Err(NotifyError::Delivery("recording notifier set to fail".into()));
        }
        Ok(())
    }
}

/// Dispatch `event` on the runtime without waiting for the outcome.
pub fn dispatch(
    notifier: Arc<dyn EventNotifier>,
    event: DomainEvent,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&event).await {
            Ok(()) => tracing::debug!(subject = %event.subject, "domain event delivered"),
            Err(e) => tracing::warn!(
                subject = %event.subject,
                error = %e,
                "domain event delivery failed (non-critical)"
            ),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn created_envelope_carries_current_image() {
        let record = Record::new()
            .with("ID", "s-1")
            .with("account", json!({"accountID": "A-1"}));

        let event = DomainEvent::created(&record, DEFAULT_EVENT_TYPE, DEFAULT_EVENT_SOURCE);
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["subject"], "s-1");
        assert_eq!(value["type"], "sample.created");
        assert_eq!(value["specversion"], "1.0");
        assert_eq!(value["datacontenttype"], "application/json");
        assert_eq!(value["data"]["currentImage"]["account"]["accountID"], "A-1");
        assert!(Uuid::parse_str(&event.id).is_ok());
    }

    #[tokio::test]
    async fn dispatch_swallows_failures() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let event = DomainEvent::created(&Record::new().with("ID", "s-1"), "t", "/s");

        dispatch(notifier.clone(), event).await.unwrap();

        assert_eq!(notifier.events().len(), 1);
    }
}
