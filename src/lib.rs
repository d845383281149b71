//! Sample enrichment: request interception for the Samples entity
//!
//! Augments plain CRUD on Sample records with cross-service enrichment and
//! field-derivation rules.
//!
//! # Core Concepts
//!
//! - **Records**: untyped field maps materialized per request; never cached
//! - **Enrichment**: references to accounts, products and employees are
//!   resolved with one batched call per domain and written back in place
//! - **Derivation**: quantity guard and overdue markers on create/update
//! - **Projection**: read queries are extended with every column enrichment needs
//!
//! # Example
//!
//! ```
//! use sample_enrichment::{ProjectionSpec, Query, SelectQuery, ensure};
//!
//! let mut query = Query::select(SelectQuery::new());
//! ensure(&mut query, &ProjectionSpec::samples());
//! assert!(query.select.unwrap().column_names().contains(&"account"));
//! ```

pub mod config;
pub mod derivation;
pub mod enrichment;
pub mod events;
pub mod projection;
pub mod record;
pub mod service;
pub mod store;
pub mod telemetry;

pub use config::{ConfigError, DomainEndpoint, ServiceConfig};
pub use derivation::{
    Clock, DerivationError, DerivationPolicy, FixedClock, MarkerStyle, Markers, SystemClock,
};
pub use enrichment::{
    DomainStatus, EnrichmentClient, EnrichmentDomain, EnrichmentError, EnrichmentOrchestrator,
    EnrichmentReport, HttpEnrichmentClient, MockEnrichmentClient,
};
pub use events::{DomainEvent, EventNotifier, HttpEventNotifier, NotifyError};
pub use projection::{ensure, Column, ProjectionSpec, Query, SelectQuery};
pub use record::{Record, ReferencePair};
pub use service::{SampleService, ServiceError, ServiceResult};
pub use store::{InMemoryStore, SampleStore, StoreError, StoreResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
