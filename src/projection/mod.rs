//! Projection ensurance for inbound read queries
//!
//! The orchestrator needs certain scalar fields and navigation expansions on
//! every record it enriches. `ensure` appends whatever a caller's column list
//! is missing, matched by name, without touching the caller's own columns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One requested column: a field reference, optionally expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    #[serde(rename = "ref", default)]
    pub reference: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expand: Option<Vec<Value>>,
    /// Anything else the caller attached (aliases, functions, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Column {
    /// A plain scalar column.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            reference: vec![name.into()],
            expand: None,
            extra: Map::new(),
        }
    }

    /// A navigation property with a wildcard expansion.
    pub fn expand_all(name: impl Into<String>) -> Self {
        Self {
            reference: vec![name.into()],
            expand: Some(vec![Value::String("*".into())]),
            extra: Map::new(),
        }
    }

    /// Head of the reference path, used for by-name matching.
    pub fn name(&self) -> Option<&str> {
        self.reference.first().map(String::as_str)
    }

    pub fn is_expansion(&self) -> bool {
        self.expand.is_some()
    }
}

/// The SELECT clause of a read query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
    /// Restrict to a single record id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub where_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SelectQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn by_id(mut self, id: impl Into<String>) -> Self {
        self.where_id = Some(id.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Names of the requested columns, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flatten()
            .filter_map(Column::name)
            .collect()
    }
}

/// An inbound query. Only SELECT queries carry a projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = "SELECT", default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectQuery>,
}

impl Query {
    pub fn select(select: SelectQuery) -> Self {
        Self {
            select: Some(select),
        }
    }

    /// A query with no SELECT clause (insert, delete, ...).
    pub fn other() -> Self {
        Self { select: None }
    }
}

/// Scalars and expansions a query must return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionSpec {
    pub scalars: Vec<String>,
    pub expansions: Vec<String>,
}

impl ProjectionSpec {
    pub fn new<S: Into<String>>(
        scalars: impl IntoIterator<Item = S>,
        expansions: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            scalars: scalars.into_iter().map(Into::into).collect(),
            expansions: expansions.into_iter().map(Into::into).collect(),
        }
    }

    /// Every field and navigation property of a Sample.
    pub fn samples() -> Self {
        Self::new(
            [
                "ID",
                "createdAt",
                "createdBy",
                "modifiedAt",
                "modifiedBy",
                "sampleName",
                "sampleType",
                "shipToAddress",
                "hazardous",
                "hazardousReason",
                "dueDate",
                "overdueStatusIcon",
                "status",
                "packagingHeight",
                "packagingWidth",
                "packagingMaterial",
            ],
            [
                "costOfSample",
                "account",
                "numberOfSamples",
                "product",
                "employee",
                "opportunity",
                "serviceCase",
            ],
        )
    }

    /// The full column list, as used for a re-fetch.
    pub fn columns(&self) -> Vec<Column> {
        self.scalars
            .iter()
            .map(Column::field)
            .chain(self.expansions.iter().map(Column::expand_all))
            .collect()
    }
}

/// Append every required column the query is missing. Returns the number
/// of columns added; 0 for queries without a SELECT clause.
pub fn ensure(query: &mut Query, spec: &ProjectionSpec) -> usize {
    let Some(select) = query.select.as_mut() else {
        return 0;
    };
    let columns = select.columns.get_or_insert_with(Vec::new);
    let before = columns.len();

    for scalar in &spec.scalars {
        if !has_column(columns, scalar) {
            columns.push(Column::field(scalar));
        }
    }
    for nav in &spec.expansions {
        if !has_column(columns, nav) {
            columns.push(Column::expand_all(nav));
        }
    }

    let added = columns.len() - before;
    if added > 0 {
        tracing::debug!(added, total = columns.len(), "projection extended");
    }
    added
}

fn has_column(columns: &[Column], name: &str) -> bool {
    columns.iter().any(|c| c.name() == Some(name))
}
