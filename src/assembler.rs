//! Merging neighbor lists back into the query documents.

use serde_json::{Value, json};

use crate::collector::{Neighbor, NeighborCollector};
use crate::dataset::QueryEntry;
use crate::error::{KnnTruthError, Result};
use crate::sampler::FilterIdSet;

/// Field holding the ground-truth neighbors.
pub const NEIGHBORS_FIELD: &str = "neighbors";

/// Field holding the filter description.
pub const FILTER_FIELD: &str = "filter";

/// Field holding the filter-id list.
pub const FILTER_IDS_FIELD: &str = "filter_vector_ids";

/// Annotates query documents with their neighbors.
#[derive(Debug, Default)]
pub struct ResultAssembler<'a> {
    filter_description: Option<&'a str>,
    filter_ids: Option<&'a FilterIdSet>,
    negation: bool,
}

impl<'a> ResultAssembler<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `filter` field with this description to every document.
    pub fn with_filter_description(mut self, description: &'a str) -> Self {
        self.filter_description = Some(description);
        self
    }

    /// Add a `filter_vector_ids` field built from the sampled set.
    ///
    /// Unless `negation` is set each query's own neighbors are added to it.
    pub fn with_filter_ids(mut self, ids: &'a FilterIdSet, negation: bool) -> Self {
        self.filter_ids = Some(ids);
        self.negation = negation;
        self
    }

    /// Drain every collector into its document, in query order.
    pub fn assemble(&self, documents: Vec<Value>, entries: &[QueryEntry]) -> Result<Vec<Value>> {
        if documents.len() != entries.len() {
            return Err(KnnTruthError::internal(format!(
                "{} documents but {} query entries",
                documents.len(),
                entries.len()
            )));
        }

        documents
            .into_iter()
            .zip(entries)
            .map(|(document, entry)| self.annotate(document, entry.collector.drain_sorted()))
            .collect()
    }

    /// Attach one query's neighbors to its document.
    pub fn annotate(&self, document: Value, neighbors: Vec<Neighbor>) -> Result<Value> {
        let Value::Object(mut object) = document else {
            return Err(KnnTruthError::invalid_format("query document is not an object"));
        };

        let neighbor_values: Vec<Value> = neighbors
            .iter()
            .map(|n| json!({"id": n.id, "distance": n.distance}))
            .collect();
        // Replaces any neighbors list the query already carried
        object.insert(NEIGHBORS_FIELD.to_string(), Value::Array(neighbor_values));

        if let Some(description) = self.filter_description {
            object.insert(FILTER_FIELD.to_string(), Value::from(description));
        }

        if let Some(sampled) = self.filter_ids {
            let ids: Vec<i64> = if self.negation {
                sampled.iter().copied().collect()
            } else {
                let mut merged = sampled.clone();
                merged.extend(neighbors.iter().map(|n| n.id));
                merged.into_iter().collect()
            };
            object.insert(FILTER_IDS_FIELD.to_string(), json!(ids));
        }

        Ok(Value::Object(object))
    }
}
