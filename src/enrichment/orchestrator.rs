//! Enrichment orchestrator
//!
//! Runs extract → build → send → reconcile for every registered domain.
//! Batch sends for all domains are dispatched concurrently; reconciliation
//! runs afterwards in registration order. A domain whose send fails is
//! reported and skipped without affecting the others.

use super::batch::{build, BatchPlan};
use super::client::{BatchResponse, EnrichmentClient, EnrichmentError};
use super::domain::EnrichmentDomain;
use super::extract::extract;
use super::http::HttpEnrichmentClient;
use super::reconcile::reconcile;
use crate::config::ServiceConfig;
use crate::record::Record;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

/// What happened to one domain during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainStatus {
    /// No record referenced the domain; no call was made
    Skipped,
    /// The batch call succeeded
    Enriched { requested: usize, applied: usize },
    /// The batch call failed; references were left as-is
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainOutcome {
    pub domain: String,
    pub status: DomainStatus,
}

/// Per-domain outcomes of one enrichment pass, in processing order.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    pub outcomes: Vec<DomainOutcome>,
}

impl EnrichmentReport {
    pub fn outcome(&self, domain: &str) -> Option<&DomainStatus> {
        self.outcomes
            .iter()
            .find(|o| o.domain == domain)
            .map(|o| &o.status)
    }

    /// References overwritten across all domains.
    pub fn applied(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                DomainStatus::Enriched { applied, .. } => applied,
                _ => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> Vec<&DomainOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DomainStatus::Failed { .. }))
            .collect()
    }

    pub fn is_fully_successful(&self) -> bool {
        self.failures().is_empty()
    }
}

struct DomainEnricher {
    domain: EnrichmentDomain,
    client: Arc<dyn EnrichmentClient>,
}

/// Orchestrates enrichment across the registered domains.
pub struct EnrichmentOrchestrator {
    enrichers: Vec<DomainEnricher>,
    /// Upper bound on each domain's batch call
    timeout: Option<Duration>,
}

impl Default for EnrichmentOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl EnrichmentOrchestrator {
    /// Create an orchestrator with no domains registered.
    pub fn new() -> Self {
        Self {
            enrichers: Vec::new(),
            timeout: None,
        }
    }

    /// Create an orchestrator for the built-in domains, each with its own
    /// HTTP client.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, EnrichmentError> {
        let timeout = config.enrichment.timeout();
        let mut orchestrator = Self::new().with_timeout(timeout);

        for domain in EnrichmentDomain::defaults() {
            let Some(endpoint) = config.domains.get(&domain.name) else {
                tracing::info!(domain = %domain.name, "no endpoint configured, domain disabled");
                continue;
            };
            let client = HttpEnrichmentClient::new(&endpoint.base_url, timeout)?
                .with_batch_path(&endpoint.batch_path);
            orchestrator.register(domain, Arc::new(client));
        }

        Ok(orchestrator)
    }

    /// Bound each domain's batch call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Register a domain with its dedicated client. Domains are processed in
    /// registration order; registering a domain name twice replaces it.
    pub fn register(&mut self, domain: EnrichmentDomain, client: Arc<dyn EnrichmentClient>) {
        let enricher = DomainEnricher { domain, client };
        match self
            .enrichers
            .iter_mut()
            .find(|e| e.domain.name == enricher.domain.name)
        {
            Some(existing) => *existing = enricher,
            None => self.enrichers.push(enricher),
        }
    }

    pub fn with_domain(
        mut self,
        domain: EnrichmentDomain,
        client: Arc<dyn EnrichmentClient>,
    ) -> Self {
        self.register(domain, client);
        self
    }

    pub fn domain_names(&self) -> Vec<&str> {
        self.enrichers.iter().map(|e| e.domain.name.as_str()).collect()
    }

    /// Enrich a page of records in place.
    pub async fn enrich(&self, records: &mut [Record]) -> EnrichmentReport {
        if records.is_empty() || self.enrichers.is_empty() {
            return EnrichmentReport {
                outcomes: self
                    .enrichers
                    .iter()
                    .map(|e| DomainOutcome {
                        domain: e.domain.name.clone(),
                        status: DomainStatus::Skipped,
                    })
                    .collect(),
            };
        }

        let plans: Vec<BatchPlan> = self
            .enrichers
            .iter()
            .map(|e| build(&extract(records, &e.domain), &e.domain))
            .collect();

        let sends = self
            .enrichers
            .iter()
            .zip(&plans)
            .map(|(enricher, plan)| self.send(enricher, plan));
        let results = join_all(sends).await;

        let mut report = EnrichmentReport::default();
        for ((enricher, plan), result) in self.enrichers.iter().zip(&plans).zip(results) {
            let domain = &enricher.domain;
            let status = match result {
                None => {
                    tracing::debug!(domain = %domain.name, "no references to enrich");
                    DomainStatus::Skipped
                }
                Some(Ok(response)) => {
                    let applied = reconcile(records, domain, plan, &response.responses);
                    tracing::info!(
                        domain = %domain.name,
                        requested = plan.len(),
                        applied,
                        "enrichment completed"
                    );
                    DomainStatus::Enriched {
                        requested: plan.len(),
                        applied,
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        domain = %domain.name,
                        requested = plan.len(),
                        error = %e,
                        "batch enrichment failed, leaving references unenriched"
                    );
                    DomainStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            report.outcomes.push(DomainOutcome {
                domain: domain.name.clone(),
                status,
            });
        }

        report
    }

    /// Enrich a single record (the post-update path).
    pub async fn enrich_one(&self, record: &mut Record) -> EnrichmentReport {
        self.enrich(std::slice::from_mut(record)).await
    }

    /// One attempt at a domain's batch call; `None` when there is nothing to send.
    async fn send(
        &self,
        enricher: &DomainEnricher,
        plan: &BatchPlan,
    ) -> Option<Result<BatchResponse, EnrichmentError>> {
        if plan.is_empty() {
            return None;
        }

        let call = enricher.client.send_batch(&plan.requests);
        let result = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(EnrichmentError::Timeout(timeout)),
            },
            None => call.await,
        };
        Some(result)
    }
}
