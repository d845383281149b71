//! Response reconciliation
//!
//! Maps each batch response back to its record through the plan's index
//! map, never through the record array position.

use super::batch::BatchPlan;
use super::client::BatchResponseEntry;
use super::domain::EnrichmentDomain;
use crate::record::Record;
use serde_json::{Map, Value};

/// Apply batch responses to `records`, returning how many references were
/// overwritten.
///
/// An entry that echoes one of the plan's correlation ids is matched by id;
/// otherwise it is matched by position. Entries without a usable payload
/// leave the record untouched.
pub fn reconcile(
    records: &mut [Record],
    domain: &EnrichmentDomain,
    plan: &BatchPlan,
    responses: &[BatchResponseEntry],
) -> usize {
    let mut applied = 0;

    for (position, entry) in responses.iter().enumerate() {
        let k = entry
            .correlation_id()
            .and_then(|id| plan.position_of(id))
            .unwrap_or(position);

        let Some(&index) = plan.index_map.get(k) else {
            tracing::debug!(
                domain = %domain.name,
                position,
                "response outside batch plan, ignoring"
            );
            continue;
        };
        let Some(reference) = entry.payload().and_then(|p| normalize(domain, p)) else {
            continue;
        };
        let Some(record) = records.get_mut(index) else {
            continue;
        };

        let display_id = reference
            .get("displayId")
            .and_then(Value::as_str)
            .unwrap_or_default();
        tracing::debug!(
            domain = %domain.name,
            index,
            display_id,
            "{} enrichment applied",
            domain.name
        );
        record.insert(domain.field.clone(), Value::Object(reference));
        applied += 1;
    }

    applied
}

/// The normalized reference shape: foreign key, display name, display id.
///
/// `None` when the payload lacks a canonical id.
fn normalize(
    domain: &EnrichmentDomain,
    payload: &Map<String, Value>,
) -> Option<Map<String, Value>> {
    let id = match payload.get("id")? {
        Value::String(s) if !s.is_empty() => Value::String(s.clone()),
        Value::Number(n) => Value::String(n.to_string()),
        _ => return None,
    };

    let mut reference = Map::new();
    reference.insert(domain.key.clone(), id);
    reference.insert(
        "name".into(),
        payload.get(&domain.name_field).cloned().unwrap_or(Value::Null),
    );
    reference.insert(
        "displayId".into(),
        payload.get("displayId").cloned().unwrap_or(Value::Null),
    );
    Some(reference)
}
