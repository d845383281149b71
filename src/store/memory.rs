//! In-memory store backend

use super::traits::{SampleStore, StoreError, StoreResult};
use crate::projection::{Column, Query};
use crate::record::{Record, ID_FIELD};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// A concurrent in-memory store. Records keep their insertion order.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: DashMap<String, (u64, Record)>,
    sequence: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with records, assigning ids where missing.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> StoreResult<Self> {
        let store = Self::new();
        for record in records {
            store.put(record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Full stored record, bypassing projection.
    pub fn get(&self, id: &str) -> Option<Record> {
        self.records.get(id).map(|entry| entry.value().1.clone())
    }

    fn put(&self, mut record: Record) -> StoreResult<Record> {
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                record.insert(ID_FIELD, id.clone());
                id
            }
        };
        let Entry::Vacant(slot) = self.records.entry(id.clone()) else {
            return Err(StoreError::Conflict(id));
        };

        let now = Utc::now().to_rfc3339();
        if !record.contains("createdAt") {
            record.insert("createdAt", now.clone());
        }
        record.insert("modifiedAt", now);

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        slot.insert((seq, record.clone()));
        Ok(record)
    }

    fn ordered(&self) -> Vec<Record> {
        let mut rows: Vec<(u64, Record)> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, record)| record).collect()
    }
}

#[async_trait]
impl SampleStore for InMemoryStore {
    async fn select(&self, query: &Query) -> StoreResult<Vec<Record>> {
        let select = query
            .select
            .as_ref()
            .ok_or_else(|| StoreError::UnsupportedQuery("query has no SELECT clause".into()))?;

        let rows = match &select.where_id {
            Some(id) => self.get(id).into_iter().collect(),
            None => self.ordered(),
        };
        let columns = select.columns.as_deref().unwrap_or_default();

        Ok(rows
            .into_iter()
            .take(select.limit.unwrap_or(usize::MAX))
            .map(|record| project(record, columns))
            .collect())
    }

    async fn find_by_id(&self, id: &str, columns: &[Column]) -> StoreResult<Option<Record>> {
        Ok(self.get(id).map(|record| project(record, columns)))
    }

    async fn insert(&self, record: Record) -> StoreResult<Record> {
        self.put(record)
    }

    async fn update(&self, id: &str, patch: Record) -> StoreResult<Option<Record>> {
        let Some(mut entry) = self.records.get_mut(id) else {
            return Ok(None);
        };

        let mut written = patch;
        written.remove(ID_FIELD);
        written.insert("modifiedAt", Utc::now().to_rfc3339());
        entry.value_mut().1.merge(written.clone());

        written.insert(ID_FIELD, id.to_string());
        Ok(Some(written))
    }
}

/// Restrict a record to the requested columns. An empty list or a `*`
/// column returns everything.
fn project(record: Record, columns: &[Column]) -> Record {
    if columns.is_empty() || columns.iter().any(|c| c.name() == Some("*")) {
        return record;
    }

    let mut projected = Record::new();
    for column in columns {
        let Some(name) = column.name() else { continue };
        let Some(value) = record.get(name) else { continue };
        let value = match (&column.expand, value) {
            (Some(expand), Value::Object(nested)) => expand_nested(nested, expand),
            _ => value.clone(),
        };
        projected.insert(name, value);
    }
    projected
}

fn expand_nested(nested: &Map<String, Value>, expand: &[Value]) -> Value {
    if expand.iter().any(|e| e.as_str() == Some("*")) {
        return Value::Object(nested.clone());
    }

    let wanted: Vec<&str> = expand
        .iter()
        .filter_map(|e| e.get("ref")?.get(0)?.as_str())
        .collect();
    Value::Object(
        nested
            .iter()
            .filter(|(k, _)| wanted.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}
