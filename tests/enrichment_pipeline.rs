//! End-to-end interception paths over HTTP domain services

mod common;

use common::{entry, mount_batch, mount_failing_batch, sample};
use sample_enrichment::{
    Column, DomainEndpoint, DomainStatus, EnrichmentOrchestrator, InMemoryStore, Query, Record,
    SampleService, SelectQuery, ServiceConfig,
};
use serde_json::json;
use std::sync::Arc;
use wiremock::MockServer;

struct Services {
    account: MockServer,
    product: MockServer,
    employee: MockServer,
}

impl Services {
    async fn start() -> Self {
        Self {
            account: MockServer::start().await,
            product: MockServer::start().await,
            employee: MockServer::start().await,
        }
    }

    fn config(&self) -> ServiceConfig {
        let mut config = ServiceConfig::default();
        config
            .domains
            .insert("account".into(), DomainEndpoint::new(self.account.uri()));
        config
            .domains
            .insert("product".into(), DomainEndpoint::new(self.product.uri()));
        config
            .domains
            .insert("employee".into(), DomainEndpoint::new(self.employee.uri()));
        config
    }
}

#[tokio::test]
async fn product_failure_keeps_account_and_employee_enrichment() {
    let services = Services::start().await;
    mount_batch(
        &services.account,
        vec![entry("account_0", "A-1", "1001", "formattedName", "Acme Corp")],
        1,
    )
    .await;
    mount_failing_batch(&services.product, 500).await;
    mount_batch(
        &services.employee,
        vec![entry("employee_0", "E-1", "E100", "formattedName", "Dana Reyes")],
        1,
    )
    .await;

    let orchestrator = EnrichmentOrchestrator::from_config(&services.config()).unwrap();
    let mut records = vec![sample("s-1", Some("A-1"), Some("P-1"), Some("E-1"))];

    let report = orchestrator.enrich(&mut records).await;

    assert!(matches!(report.outcome("product"), Some(DomainStatus::Failed { .. })));
    assert_eq!(
        records[0].get("account"),
        Some(&json!({"accountID": "A-1", "name": "Acme Corp", "displayId": "1001"}))
    );
    assert_eq!(records[0].get("product"), Some(&json!({"productID": "P-1"})));
    assert_eq!(records[0].reference("employee").unwrap()["name"], "Dana Reyes");
}

#[tokio::test]
async fn records_without_accounts_send_no_account_batch() {
    let services = Services::start().await;
    mount_batch(&services.account, vec![], 0).await;
    mount_batch(
        &services.product,
        (0..10)
            .map(|k| entry(&format!("product_{}", k), "P-1", "P100", "name", "Widget"))
            .collect(),
        1,
    )
    .await;

    let orchestrator = EnrichmentOrchestrator::from_config(&services.config()).unwrap();
    let mut records: Vec<Record> = (0..10)
        .map(|i| sample(&format!("s-{}", i), None, Some("P-1"), None))
        .collect();
    let untouched = records.clone();

    let report = orchestrator.enrich(&mut records).await;

    assert_eq!(report.outcome("account"), Some(&DomainStatus::Skipped));
    assert_eq!(report.outcome("employee"), Some(&DomainStatus::Skipped));
    assert_eq!(
        report.outcome("product"),
        Some(&DomainStatus::Enriched { requested: 10, applied: 10 })
    );
    for (after, before) in records.iter().zip(&untouched) {
        assert_eq!(after.get("account"), before.get("account"));
        assert_eq!(after.reference("product").unwrap()["name"], "Widget");
    }
}

#[tokio::test]
async fn skipped_records_do_not_shift_responses() {
    let services = Services::start().await;
    // Positional answers only: the remote echoes no correlation ids.
    mount_batch(
        &services.account,
        vec![
            json!({
                "body": {"value": {"id": "A-2", "displayId": "1002", "formattedName": "Beta"}}
            }),
            json!({
                "body": {"value": {"id": "A-4", "displayId": "1004", "formattedName": "Delta"}}
            }),
        ],
        1,
    )
    .await;

    let orchestrator = EnrichmentOrchestrator::from_config(&services.config()).unwrap();
    let mut records = vec![
        sample("s-1", None, None, None),
        sample("s-2", Some("A-2"), None, None),
        sample("s-3", None, None, None),
        sample("s-4", Some("A-4"), None, None),
    ];

    orchestrator.enrich(&mut records).await;

    assert!(records[0].get("account").is_none());
    assert_eq!(records[1].reference("account").unwrap()["name"], "Beta");
    assert!(records[2].get("account").is_none());
    assert_eq!(records[3].reference("account").unwrap()["name"], "Delta");
}

#[tokio::test]
async fn read_path_through_service() {
    let services = Services::start().await;
    mount_batch(
        &services.account,
        vec![entry("account_0", "A-1", "1001", "formattedName", "Acme Corp")],
        1,
    )
    .await;

    let store = Arc::new(
        InMemoryStore::with_records(vec![
            sample("s-1", Some("A-1"), None, None).with("status", "OPEN"),
        ])
        .unwrap(),
    );
    let service = SampleService::from_config(&services.config(), store).unwrap();

    let records = service
        .read(Query::select(
            SelectQuery::new().with_columns(vec![Column::field("status")]),
        ))
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get_str("status"), Some("OPEN"));
    assert_eq!(records[0].get_str("ID"), Some("s-1"));
    assert_eq!(records[0].reference("account").unwrap()["displayId"], "1001");
}

#[tokio::test]
async fn update_path_returns_enriched_entity_after_domain_failure() {
    let services = Services::start().await;
    mount_batch(
        &services.account,
        vec![entry("account_0", "A-1", "1001", "formattedName", "Acme Corp")],
        1,
    )
    .await;
    mount_failing_batch(&services.product, 502).await;

    let store = Arc::new(
        InMemoryStore::with_records(vec![sample("s-1", Some("A-1"), Some("P-1"), None)]).unwrap(),
    );
    let service = SampleService::from_config(&services.config(), store.clone()).unwrap();

    let updated = service
        .update("s-1", Record::new().with("status", "SHIPPED"))
        .await
        .unwrap();

    assert_eq!(updated.get_str("status"), Some("SHIPPED"));
    assert_eq!(updated.reference("account").unwrap()["name"], "Acme Corp");
    assert_eq!(updated.get("product"), Some(&json!({"productID": "P-1"})));
    // Enrichment never leaks back into the store.
    assert_eq!(
        store.get("s-1").unwrap().get("account"),
        Some(&json!({"accountID": "A-1"}))
    );
}

#[tokio::test]
async fn create_with_zero_quantity_is_rejected_before_persistence() {
    let services = Services::start().await;
    let store = Arc::new(InMemoryStore::new());
    let service = SampleService::from_config(&services.config(), store.clone()).unwrap();

    let err = service
        .create(Record::new().with("numberOfSamples", json!({"content": 0})))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
    assert!(store.is_empty());

    let created = service
        .create(Record::new().with("numberOfSamples", json!({"content": 5})))
        .await
        .unwrap();
    assert!(created.id().is_some());
    assert_eq!(store.len(), 1);
}
