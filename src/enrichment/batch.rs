//! Batch request construction
//!
//! Turns reference pairs into single-purpose GET descriptors plus the
//! index map the reconciler uses to find each response's record.

use super::domain::EnrichmentDomain;
use crate::record::ReferencePair;
use serde::{Deserialize, Serialize};

/// One multiplexed sub-request of a `$batch` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Correlation id, unique within the batch
    pub id: String,
    pub url: String,
    pub method: String,
    /// Foreign id this request resolves (not sent on the wire)
    #[serde(skip)]
    pub foreign_id: String,
}

impl BatchRequest {
    pub fn get(
        id: impl Into<String>,
        url: impl Into<String>,
        foreign_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            method: "GET".to_string(),
            foreign_id: foreign_id.into(),
        }
    }
}

/// Requests for one domain and the record index behind each of them.
///
/// `index_map[k]` is the position of the record that produced `requests[k]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchPlan {
    pub requests: Vec<BatchRequest>,
    pub index_map: Vec<usize>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    /// Position of the request with the given correlation id.
    pub fn position_of(&self, correlation_id: &str) -> Option<usize> {
        self.requests.iter().position(|r| r.id == correlation_id)
    }
}

/// Build the batch plan for `pairs`, in extraction order.
pub fn build(pairs: &[ReferencePair], domain: &EnrichmentDomain) -> BatchPlan {
    let mut plan = BatchPlan {
        requests: Vec::with_capacity(pairs.len()),
        index_map: Vec::with_capacity(pairs.len()),
    };

    for pair in pairs {
        let k = plan.requests.len();
        plan.requests.push(BatchRequest::get(
            domain.correlation_id(k),
            domain.path_for(&pair.foreign_id),
            pair.foreign_id.clone(),
        ));
        plan.index_map.push(pair.index);
    }

    plan
}
