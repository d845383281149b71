//! Request interception for the Samples entity
//!
//! `SampleService` wires the projection ensurer, derivation rules,
//! enrichment orchestrator and event notifier around a `SampleStore`:
//!
//! - read: ensure projection → select → enrich page
//! - create: guard + derive → insert → notify (fire-and-forget)
//! - update: derive (per policy) → update → re-fetch full projection → enrich one

use crate::config::ServiceConfig;
use crate::derivation::{Clock, DerivationError, DerivationPolicy, SystemClock};
use crate::enrichment::{EnrichmentDomain, EnrichmentOrchestrator, EnrichmentReport};
use crate::events::{
    dispatch, DomainEvent, EventNotifier, HttpEventNotifier, DEFAULT_EVENT_SOURCE,
    DEFAULT_EVENT_TYPE,
};
use crate::projection::{ensure, ProjectionSpec, Query};
use crate::record::Record;
use crate::store::{SampleStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(#[from] DerivationError),

    #[error("Sample not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// HTTP status the entry point replies with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Store(StoreError::Conflict(_)) => 409,
            Self::Store(_) | Self::Config(_) => 500,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

struct Notification {
    notifier: Arc<dyn EventNotifier>,
    event_type: String,
    source: String,
}

/// The Samples entity handler.
pub struct SampleService {
    store: Arc<dyn SampleStore>,
    orchestrator: EnrichmentOrchestrator,
    notification: Option<Notification>,
    policy: DerivationPolicy,
    projection: ProjectionSpec,
    clock: Arc<dyn Clock>,
}

impl SampleService {
    pub fn new(store: Arc<dyn SampleStore>, orchestrator: EnrichmentOrchestrator) -> Self {
        Self {
            store,
            orchestrator,
            notification: None,
            policy: DerivationPolicy::default(),
            projection: ProjectionSpec::samples(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the HTTP-backed service described by `config`.
    pub fn from_config(config: &ServiceConfig, store: Arc<dyn SampleStore>) -> ServiceResult<Self> {
        let orchestrator = EnrichmentOrchestrator::from_config(config)
            .map_err(|e| ServiceError::Config(e.to_string()))?;
        let mut service = Self::new(store, orchestrator).with_policy(config.derivation.clone());

        if let Some(events) = &config.events {
            let notifier = HttpEventNotifier::new(&events.url, events.timeout())
                .map_err(|e| ServiceError::Config(e.to_string()))?;
            service =
                service.with_notifier_as(Arc::new(notifier), &events.event_type, &events.source);
        }

        Ok(service)
    }

    pub fn with_policy(mut self, policy: DerivationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_projection(mut self, projection: ProjectionSpec) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_notifier(self, notifier: Arc<dyn EventNotifier>) -> Self {
        self.with_notifier_as(notifier, DEFAULT_EVENT_TYPE, DEFAULT_EVENT_SOURCE)
    }

    pub fn with_notifier_as(
        mut self,
        notifier: Arc<dyn EventNotifier>,
        event_type: &str,
        source: &str,
    ) -> Self {
        self.notification = Some(Notification {
            notifier,
            event_type: event_type.to_string(),
            source: source.to_string(),
        });
        self
    }

    pub fn orchestrator(&self) -> &EnrichmentOrchestrator {
        &self.orchestrator
    }

    // === Read ===

    /// Guarantee the query returns everything enrichment needs.
    pub fn before_read(&self, query: &mut Query) {
        ensure(query, &self.projection);
    }

    /// Enrich a page of fetched records.
    pub async fn after_read(&self, records: &mut [Record]) -> EnrichmentReport {
        tracing::debug!(count = records.len(), "enriching read result");
        self.orchestrator.enrich(records).await
    }

    pub async fn read(&self, mut query: Query) -> ServiceResult<Vec<Record>> {
        self.before_read(&mut query);
        let mut records = self.store.select(&query).await?;
        self.after_read(&mut records).await;
        Ok(records)
    }

    // === Create ===

    /// Validate and derive fields on a create payload.
    pub fn before_create(&self, payload: &mut Record) -> ServiceResult<()> {
        self.policy.apply(payload, self.clock.today()).map_err(|e| {
            tracing::info!(error = %e, "create rejected");
            ServiceError::from(e)
        })
    }

    /// Notify the event sink about a created record, when it references an
    /// account. Returns the handle of the spawned delivery.
    pub fn after_create(&self, created: &Record) -> Option<JoinHandle<()>> {
        let notification = self.notification.as_ref()?;
        let account = EnrichmentDomain::account();
        if created.foreign_id(&account.field, &account.key).is_none() {
            tracing::debug!("created sample has no account, skipping domain event");
            return None;
        }

        let event = DomainEvent::created(created, &notification.event_type, &notification.source);
        Some(dispatch(notification.notifier.clone(), event))
    }

    pub async fn create(&self, mut payload: Record) -> ServiceResult<Record> {
        self.before_create(&mut payload)?;
        let created = self.store.insert(payload).await?;
        tracing::info!(record_id = created.id().unwrap_or_default(), "sample created");
        self.after_create(&created);
        Ok(created)
    }

    // === Update ===

    pub async fn update(&self, id: &str, mut patch: Record) -> ServiceResult<Record> {
        if self.policy.apply_on_update {
            self.policy.apply(&mut patch, self.clock.today())?;
        }
        let result = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;
        Ok(self.after_update(result).await)
    }

    /// Replace an update result with the fully projected, enriched record.
    /// Falls back to `result` when the re-fetch yields nothing.
    pub async fn after_update(&self, result: Record) -> Record {
        let Some(id) = result.id().map(str::to_string) else {
            tracing::debug!("update result has no ID, returning it unchanged");
            return result;
        };

        match self.store.find_by_id(&id, &self.projection.columns()).await {
            Ok(Some(mut entity)) => {
                let report = self.orchestrator.enrich_one(&mut entity).await;
                if !report.is_fully_successful() {
                    tracing::info!(
                        record_id = %id,
                        failed = report.failures().len(),
                        "update response partially enriched"
                    );
                }
                entity
            }
            Ok(None) => {
                tracing::warn!(record_id = %id, "updated sample vanished before re-fetch");
                result
            }
            Err(e) => {
                tracing::warn!(record_id = %id, error = %e, "re-fetch after update failed");
                result
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::{FixedClock, MarkerStyle, OVERDUE_STATUS_ICON};
    use crate::enrichment::{mock_entity, MockEnrichmentClient};
    use crate::events::RecordingNotifier;
    use crate::projection::SelectQuery;
    use crate::store::InMemoryStore;
    use chrono::NaiveDate;
    use serde_json::json;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()))
    }

    fn orchestrator() -> EnrichmentOrchestrator {
        EnrichmentOrchestrator::new().with_domain(
            EnrichmentDomain::account(),
            Arc::new(
                MockEnrichmentClient::new()
                    .with_entity("A-1", mock_entity("A-1", "1001", "formattedName", "Acme Corp")),
            ),
        )
    }

    fn service(store: Arc<InMemoryStore>) -> SampleService {
        SampleService::new(store, orchestrator()).with_clock(clock())
    }

    #[tokio::test]
    async fn create_rejects_zero_quantity_without_persisting() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());

        let err = service
            .create(Record::new().with("numberOfSamples", json!({"content": 0})))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn create_derives_icon_and_persists() {
        let store = Arc::new(InMemoryStore::new());
        let service = service(store.clone());

        let created = service
            .create(
                Record::new()
                    .with("numberOfSamples", json!({"content": 5}))
                    .with("dueDate", "2026-03-14"),
            )
            .await
            .unwrap();

        assert_eq!(created.get_str(OVERDUE_STATUS_ICON), Some("sap-icon://alert"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn after_create_notifies_only_with_account() {
        let notifier = Arc::new(RecordingNotifier::new());
        let service = service(Arc::new(InMemoryStore::new())).with_notifier(notifier.clone());

        let without = Record::new().with("ID", "s-0");
        assert!(service.after_create(&without).is_none());

        let with = Record::new()
            .with("ID", "s-1")
            .with("account", json!({"accountID": "A-1"}));
        service.after_create(&with).unwrap().await.unwrap();

        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject, "s-1");
    }

    #[tokio::test]
    async fn failing_notifier_does_not_fail_create() {
        let notifier = Arc::new(RecordingNotifier::failing());
        let service = service(Arc::new(InMemoryStore::new())).with_notifier(notifier);

        let created = service
            .create(Record::new().with("account", json!({"accountID": "A-1"})))
            .await;

        assert!(created.is_ok());
    }

    #[tokio::test]
    async fn read_ensures_projection_and_enriches() {
        let store = Arc::new(
            InMemoryStore::with_records(vec![
                Record::new()
                    .with("ID", "s-1")
                    .with("sampleName", "Kit")
                    .with("account", json!({"accountID": "A-1"})),
            ])
            .unwrap(),
        );
        let service = service(store);

        let query = Query::select(
            SelectQuery::new().with_columns(vec![crate::projection::Column::field("ID")]),
        );
        let records = service.read(query).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get_str("sampleName"), Some("Kit"));
        assert_eq!(
            records[0].get("account"),
            Some(&json!({"accountID": "A-1", "name": "Acme Corp", "displayId": "1001"}))
        );
    }

    #[tokio::test]
    async fn update_refetches_and_enriches() {
        let store = Arc::new(
            InMemoryStore::with_records(vec![Record::new()
                .with("ID", "s-1")
                .with("sampleName", "Kit")
                .with("account", json!({"accountID": "A-1"}))])
            .unwrap(),
        );
        let service = service(store);

        let updated = service
            .update("s-1", Record::new().with("status", "SHIPPED"))
            .await
            .unwrap();

        assert_eq!(updated.get_str("status"), Some("SHIPPED"));
        assert_eq!(updated.get_str("sampleName"), Some("Kit"));
        assert_eq!(updated.reference("account").unwrap()["name"], "Acme Corp");
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let service = service(Arc::new(InMemoryStore::new()));
        let err = service.update("nope", Record::new()).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn update_derivation_follows_policy() {
        let seed = || {
            InMemoryStore::with_records(vec![Record::new().with("ID", "s-1")]).unwrap()
        };
        let patch = || Record::new().with("dueDate", "2026-03-01");

        let off = service(Arc::new(seed()));
        let untouched = off.update("s-1", patch()).await.unwrap();
        assert!(!untouched.contains(OVERDUE_STATUS_ICON));

        let on = service(Arc::new(seed())).with_policy(DerivationPolicy {
            marker: MarkerStyle::Icon,
            apply_on_update: true,
            ..Default::default()
        });
        let marked = on.update("s-1", patch()).await.unwrap();
        assert_eq!(marked.get_str(OVERDUE_STATUS_ICON), Some("sap-icon://alert"));

        let rejected = on
            .update("s-1", Record::new().with("numberOfSamples", json!({"content": -1})))
            .await
            .unwrap_err();
        assert_eq!(rejected.status_code(), 400);
    }
}
