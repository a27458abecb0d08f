//! Context retrieval: targeted (single filtered query) or broad (one query per
//! source category, merged).
//!
//! The query is embedded exactly once per call regardless of strategy.

use std::sync::Arc;

use futures::future::join_all;
use rag_store::{EmbeddingsProvider, IndexHandle, MetaFilter, RetrievedChunk};
use tracing::{debug, info, instrument};

use crate::api_types::{QueryFilters, present};
use crate::cfg::BroadConfig;
use crate::classify::Classifier;
use crate::error::ContextorError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Targeted,
    Broad,
}

/// Chunks plus the strategy that produced them.
#[derive(Clone, Debug)]
pub struct Retrieval {
    pub strategy: Strategy,
    pub chunks: Vec<RetrievedChunk>,
}

pub struct Retriever {
    index: Arc<IndexHandle>,
    embedder: Arc<dyn EmbeddingsProvider>,
    classifier: Classifier,
    broad: BroadConfig,
}

impl Retriever {
    pub fn new(
        index: Arc<IndexHandle>,
        embedder: Arc<dyn EmbeddingsProvider>,
        classifier: Classifier,
        broad: BroadConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            classifier,
            broad,
        }
    }

    /// Broad fan-out needs state and year, no explicit source type, and a
    /// broad classification (which already excludes district/block scope).
    pub fn strategy_for(&self, query: &str, filters: &QueryFilters) -> Strategy {
        let broad = self.classifier.classify(query, filters).broad
            && present(&filters.state).is_some()
            && present(&filters.year).is_some()
            && present(&filters.source_type).is_none();
        if broad { Strategy::Broad } else { Strategy::Targeted }
    }

    /// Any index or embedding failure surfaces as [`ContextorError::RetrievalUnavailable`].
    #[instrument(skip_all, fields(top_k = top_k))]
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
        filters: &QueryFilters,
    ) -> Result<Retrieval, ContextorError> {
        let strategy = self.strategy_for(query, filters);
        let index = self.index.get().await?;
        let collection = self.index.collection();
        let vector = self.embedder.embed(query).await?;

        let chunks = match strategy {
            Strategy::Targeted => {
                let filter = filters.to_meta_filter();
                index.query(collection, &vector, top_k, filter.as_ref()).await?
            }
            Strategy::Broad => {
                let base = broad_base_filters(filters);
                let per_cat = self.broad.categories.iter().map(|cat| {
                    let mut conds = base.clone();
                    conds.push(MetaFilter::eq("source_type", cat.as_str()));
                    let filter = MetaFilter::all(conds);
                    let index = index.clone();
                    let vector = &vector;
                    async move {
                        index
                            .query(collection, vector, self.broad.per_category, filter.as_ref())
                            .await
                    }
                });
                let mut merged = Vec::new();
                for (cat, res) in self.broad.categories.iter().zip(join_all(per_cat).await) {
                    let hits = res?;
                    debug!(target: "contextor::retrieve", category = %cat, hits = hits.len(), "category results");
                    merged.extend(hits);
                }
                merge_ranked(merged, self.broad.limit)
            }
        };

        info!(target: "contextor::retrieve", ?strategy, chunks = chunks.len(), "retrieved context");
        Ok(Retrieval { strategy, chunks })
    }
}

/// State, year and categorization conditions shared by every broad sub-query.
fn broad_base_filters(filters: &QueryFilters) -> Vec<MetaFilter> {
    [
        ("state", &filters.state),
        ("year", &filters.year),
        ("categorization", &filters.categorization),
    ]
    .into_iter()
    .filter_map(|(k, v)| present(v).map(|v| MetaFilter::eq(k, v)))
    .collect()
}

/// Ascending distance; equal distances keep category order. Truncated to `limit`.
pub fn merge_ranked(mut chunks: Vec<RetrievedChunk>, limit: usize) -> Vec<RetrievedChunk> {
    chunks.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    chunks.truncate(limit);
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::Metadata;

    fn chunk(id: &str, distance: f32) -> RetrievedChunk {
        RetrievedChunk {
            id: id.into(),
            text: id.into(),
            metadata: Metadata::new(),
            distance,
        }
    }

    #[test]
    fn merge_is_stable_for_ties_and_truncates() {
        let merged = merge_ranked(
            vec![chunk("a", 0.4), chunk("b", 0.2), chunk("c", 0.2), chunk("d", 0.9)],
            3,
        );
        let ids: Vec<_> = merged.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn broad_base_ignores_blank_fields() {
        let f = QueryFilters {
            state: Some("Gujarat".into()),
            year: Some("2023".into()),
            categorization: Some("".into()),
            ..Default::default()
        };
        assert_eq!(broad_base_filters(&f).len(), 2);
    }
}
