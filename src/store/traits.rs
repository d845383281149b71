//! Primary store contract

use crate::projection::{Column, Query};
use crate::record::Record;
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// The persistence collaborator behind the Samples entity.
///
/// Implementations must be thread-safe (Send + Sync); one store is shared by
/// every in-flight request.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Execute a read query, honoring its column list.
    async fn select(&self, query: &Query) -> StoreResult<Vec<Record>>;

    /// Re-fetch one record with an explicit column list.
    async fn find_by_id(&self, id: &str, columns: &[Column]) -> StoreResult<Option<Record>>;

    /// Persist a new record, returning it as stored.
    async fn insert(&self, record: Record) -> StoreResult<Record>;

    /// Apply a partial update. Returns the written fields together with the
    /// record id, or `None` when the id is unknown.
    async fn update(&self, id: &str, patch: Record) -> StoreResult<Option<Record>>;
}
