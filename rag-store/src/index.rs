//! Backend-agnostic vector index interface.

use async_trait::async_trait;

use crate::errors::RagError;
use crate::filters::MetaFilter;
use crate::record::{IndexRecord, RetrievedChunk};

/// Nearest-neighbour index over named collections.
///
/// Implementations return `query` results sorted ascending by distance, ties in
/// insertion order.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Short backend label for logs and `/health` (`"qdrant"`, `"memory"`).
    fn backend(&self) -> &'static str;

    async fn list_collections(&self) -> Result<Vec<String>, RagError>;

    /// Creates the collection if missing; existing collections are left untouched.
    async fn ensure_collection(&self, name: &str, dim: usize) -> Result<(), RagError>;

    /// Returns `false` when the collection did not exist.
    async fn delete_collection(&self, name: &str) -> Result<bool, RagError>;

    /// Upserts `records[i]` with `vectors[i]`; returns the number written.
    async fn add(
        &self,
        name: &str,
        records: &[IndexRecord],
        vectors: &[Vec<f32>],
    ) -> Result<usize, RagError>;

    async fn query(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<RetrievedChunk>, RagError>;

    async fn count(&self, name: &str) -> Result<u64, RagError>;
}

/// Shared precondition for [`VectorIndex::add`].
pub(crate) fn check_add_input(records: &[IndexRecord], vectors: &[Vec<f32>]) -> Result<(), RagError> {
    if records.len() != vectors.len() {
        return Err(RagError::InvalidRecord(format!(
            "{} records but {} vectors",
            records.len(),
            vectors.len()
        )));
    }
    if let Some(r) = records.iter().find(|r| r.id.trim().is_empty()) {
        return Err(RagError::InvalidRecord(format!("empty id for text `{}`", r.text)));
    }
    Ok(())
}
