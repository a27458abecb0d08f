//! Lazily connected, shared index handle.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::{IndexBackend, RagConfig};
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::memory::MemoryIndex;
use crate::qdrant_facade::QdrantIndex;

/// Connect-once access to the configured [`VectorIndex`].
///
/// Concurrent first callers share a single connect attempt. A failed attempt
/// leaves the handle empty, so the next caller tries again.
pub struct IndexHandle {
    cfg: RagConfig,
    cell: OnceCell<Arc<dyn VectorIndex>>,
}

impl IndexHandle {
    /// Handle that connects on first use.
    pub fn lazy(cfg: RagConfig) -> Self {
        Self {
            cfg,
            cell: OnceCell::new(),
        }
    }

    /// Handle around an already constructed index (tests, embedded setups).
    pub fn from_index(cfg: RagConfig, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            cfg,
            cell: OnceCell::new_with(Some(index)),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Default collection used by chat retrieval.
    pub fn collection(&self) -> &str {
        &self.cfg.collection
    }

    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }

    /// Returns the connected index, connecting first if needed.
    pub async fn get(&self) -> Result<Arc<dyn VectorIndex>, RagError> {
        self.cell
            .get_or_try_init(|| connect(&self.cfg))
            .await
            .cloned()
    }
}

async fn connect(cfg: &RagConfig) -> Result<Arc<dyn VectorIndex>, RagError> {
    match cfg.backend {
        IndexBackend::Memory => {
            info!(target: "rag_store::handle", "using in-memory vector index");
            Ok(Arc::new(MemoryIndex::new()))
        }
        IndexBackend::Qdrant => match QdrantIndex::connect(cfg).await {
            Ok(idx) => Ok(Arc::new(idx)),
            Err(e) => {
                warn!(target: "rag_store::handle", error = %e, "vector index connect failed");
                Err(e)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_connects_once() {
        let handle = Arc::new(IndexHandle::lazy(RagConfig::memory("gw")));
        assert!(!handle.is_connected());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let h = handle.clone();
                tokio::spawn(async move { h.get().await.unwrap() })
            })
            .collect();
        let mut got = Vec::new();
        for t in tasks {
            got.push(t.await.unwrap());
        }
        assert!(got.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(handle.is_connected());
    }

    #[tokio::test]
    async fn failed_connect_leaves_handle_empty() {
        // nothing listens on port 9; the connect must fail and not be cached
        let cfg = RagConfig::new_default("http://127.0.0.1:9", "gw");
        let handle = IndexHandle::lazy(cfg);
        assert!(handle.get().await.is_err());
        assert!(!handle.is_connected());
    }
}
