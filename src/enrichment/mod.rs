//! Cross-service enrichment of Sample references
//!
//! Records returned by the primary store reference entities owned by other
//! services (accounts, products, employees). This module resolves those
//! references in one batched call per domain and writes the display data
//! back onto the records.
//!
//! # Pipeline
//!
//! - **extract**: find `(record index, foreign id)` pairs for a domain
//! - **build**: turn pairs into GET sub-requests plus an index map
//! - **send**: one `$batch` call through the domain's `EnrichmentClient`
//! - **reconcile**: map responses back through the index map
//!
//! `EnrichmentOrchestrator` runs the pipeline for every registered domain.
//!
//! # Example
//!
//! ```ignore
//! use sample_enrichment::enrichment::{EnrichmentDomain, EnrichmentOrchestrator};
//!
//! let orchestrator = EnrichmentOrchestrator::new()
//!     .with_domain(EnrichmentDomain::account(), account_client)
//!     .with_domain(EnrichmentDomain::product(), product_client);
//!
//! let report = orchestrator.enrich(&mut records).await;
//! for failure in report.failures() {
//!     eprintln!("{} was not enriched", failure.domain);
//! }
//! ```

mod batch;
mod client;
mod domain;
mod extract;
mod http;
mod orchestrator;
mod reconcile;

pub use batch::{build, BatchPlan, BatchRequest};
pub use client::{
    mock_entity, BatchEnvelope, BatchResponse, BatchResponseEntry, EnrichmentClient,
    EnrichmentError, MockEnrichmentClient,
};
pub use domain::EnrichmentDomain;
pub use extract::extract;
pub use http::{HttpEnrichmentClient, DEFAULT_BATCH_PATH};
pub use orchestrator::{DomainOutcome, DomainStatus, EnrichmentOrchestrator, EnrichmentReport};
pub use reconcile::reconcile;
