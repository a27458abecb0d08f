//! Process-local index using cosine similarity.
//!
//! Collections live in a `HashMap` behind a `tokio::sync::RwLock`; points keep
//! insertion order so equal distances come back in the order they were added.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::RagError;
use crate::filters::MetaFilter;
use crate::index::{VectorIndex, check_add_input};
use crate::record::{IndexRecord, RetrievedChunk};

#[derive(Debug, Clone)]
struct StoredPoint {
    record: IndexRecord,
    vector: Vec<f32>,
}

#[derive(Debug, Default)]
struct Collection {
    dim: Option<usize>,
    points: Vec<StoredPoint>,
}

#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn check_dim(coll: &Collection, got: usize) -> Result<(), RagError> {
    match coll.dim {
        Some(want) if want != got => Err(RagError::VectorSizeMismatch { got, want }),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_collections(&self) -> Result<Vec<String>, RagError> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn ensure_collection(&self, name: &str, dim: usize) -> Result<(), RagError> {
        let mut collections = self.collections.write().await;
        let coll = collections.entry(name.to_string()).or_default();
        if coll.dim.is_none() && dim > 0 {
            coll.dim = Some(dim);
        }
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, RagError> {
        Ok(self.collections.write().await.remove(name).is_some())
    }

    async fn add(
        &self,
        name: &str,
        records: &[IndexRecord],
        vectors: &[Vec<f32>],
    ) -> Result<usize, RagError> {
        check_add_input(records, vectors)?;
        let mut collections = self.collections.write().await;

        // whole batch is checked before anything is written
        let want = collections
            .get(name)
            .and_then(|c| c.dim)
            .or_else(|| vectors.first().map(Vec::len));
        if let Some(want) = want {
            if let Some(bad) = vectors.iter().find(|v| v.len() != want) {
                return Err(RagError::VectorSizeMismatch { got: bad.len(), want });
            }
        }

        let coll = collections.entry(name.to_string()).or_default();
        if let Some(want) = want {
            coll.dim.get_or_insert(want);
        }
        for (record, vector) in records.iter().zip(vectors) {
            let point = StoredPoint {
                record: record.clone(),
                vector: vector.clone(),
            };
            match coll.points.iter_mut().find(|p| p.record.id == record.id) {
                Some(existing) => *existing = point,
                None => coll.points.push(point),
            }
        }
        debug!(target: "rag_store::memory", collection = name, added = records.len(), total = coll.points.len(), "upserted");
        Ok(records.len())
    }

    async fn query(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let collections = self.collections.read().await;
        let coll = collections
            .get(name)
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()))?;
        check_dim(coll, vector.len())?;

        let mut hits: Vec<RetrievedChunk> = coll
            .points
            .iter()
            .filter(|p| filter.is_none_or(|f| f.matches(&p.record.metadata)))
            .map(|p| RetrievedChunk {
                id: p.record.id.clone(),
                text: p.record.text.clone(),
                metadata: p.record.metadata.clone(),
                distance: (1.0 - cosine_similarity(&p.vector, vector)).max(0.0),
            })
            .collect();

        // stable: equal distances keep insertion order
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    async fn count(&self, name: &str) -> Result<u64, RagError> {
        let collections = self.collections.read().await;
        collections
            .get(name)
            .map(|c| c.points.len() as u64)
            .ok_or_else(|| RagError::CollectionNotFound(name.to_string()))
    }
}
