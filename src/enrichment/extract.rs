//! Reference extraction

use super::domain::EnrichmentDomain;
use crate::record::{Record, ReferencePair};

/// Collect `(index, foreign id)` for every record that carries a populated
/// reference for `domain`. Records without one contribute nothing.
pub fn extract(records: &[Record], domain: &EnrichmentDomain) -> Vec<ReferencePair> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match record.foreign_id(&domain.field, &domain.key) {
            Some(id) => Some(ReferencePair::new(index, id)),
            None => {
                tracing::debug!(
                    domain = %domain.name,
                    index,
                    "record has no {}, skipping",
                    domain.key
                );
                None
            }
        })
        .collect()
}
