//! Sample records as they flow through the interception layer
//!
//! A record is an untyped field map materialized by the primary store for
//! one request. Derivation rules mutate it before persistence and the
//! reconciler mutates its reference fields after a fetch; nothing here is
//! cached across requests.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity field of a Sample.
pub const ID_FIELD: &str = "ID";

/// A single entity record: field name → JSON value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Builder-style field insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// The record's identity, if populated.
    pub fn id(&self) -> Option<&str> {
        self.0
            .get(ID_FIELD)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// A nested reference field (`account`, `product`, ...) when it is an object.
    pub fn reference(&self, field: &str) -> Option<&Map<String, Value>> {
        self.0.get(field).and_then(Value::as_object)
    }

    /// The foreign id carried by a reference field under `key`.
    ///
    /// Empty strings and non-scalar ids count as "no reference". Numeric ids
    /// are rendered to their decimal form.
    pub fn foreign_id(&self, field: &str, key: &str) -> Option<String> {
        match self.reference(field)?.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Overwrite (or merge into) fields from another record.
    pub fn merge(&mut self, patch: Record) {
        for (k, v) in patch.0 {
            self.0.insert(k, v);
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A record position paired with the foreign id it references.
///
/// Built per enrichment pass and discarded after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencePair {
    /// Position of the record in the batch being enriched
    pub index: usize,
    /// Non-empty id of the external entity
    pub foreign_id: String,
}

impl ReferencePair {
    pub fn new(index: usize, foreign_id: impl Into<String>) -> Self {
        Self {
            index,
            foreign_id: foreign_id.into(),
        }
    }
}
