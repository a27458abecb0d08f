//! Runtime and collection configuration.

use std::str::FromStr;

use crate::errors::RagError;

pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "groundwater";

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

/// Which index implementation `IndexHandle` connects to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexBackend {
    Qdrant,
    /// Process-local index; contents are lost on restart.
    Memory,
}

impl FromStr for IndexBackend {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qdrant" => Ok(Self::Qdrant),
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            other => Err(RagError::Config(format!("unknown VECTOR_BACKEND `{other}`"))),
        }
    }
}

/// Configuration for the vector index.
#[derive(Clone, Debug, PartialEq)]
pub struct RagConfig {
    pub backend: IndexBackend,
    /// Qdrant gRPC endpoint, e.g. `http://localhost:6334`.
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Default collection for chat retrieval.
    pub collection: String,
    /// Distance function (Cosine by default).
    pub distance: DistanceKind,
    /// Upsert batch size (typical range: 128..512).
    pub upsert_batch: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Expected embedding dimension; checked on ingest when set.
    pub embedding_dim: Option<usize>,
}

impl RagConfig {
    /// Creates a sane default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            backend: IndexBackend::Qdrant,
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            upsert_batch: 256,
            exact_search: false,
            embedding_dim: None,
        }
    }

    /// In-memory backend, for local runs and tests.
    pub fn memory(collection: impl Into<String>) -> Self {
        Self {
            backend: IndexBackend::Memory,
            ..Self::new_default(DEFAULT_QDRANT_URL, collection)
        }
    }

    pub fn from_env() -> Result<Self, RagError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads `VECTOR_BACKEND`, `QDRANT_URL`, `QDRANT_API_KEY`, `QDRANT_COLLECTION`,
    /// `QDRANT_BATCH_SIZE`, `RAG_EXACT_SEARCH`, `EMBEDDING_DIM`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RagError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend = match get("VECTOR_BACKEND") {
            Some(v) => v.parse()?,
            None => IndexBackend::Qdrant,
        };
        let upsert_batch = match get("QDRANT_BATCH_SIZE") {
            Some(v) => v
                .parse::<usize>()
                .map_err(|_| RagError::Config(format!("QDRANT_BATCH_SIZE `{v}` is not a number")))?,
            None => 256,
        };
        let embedding_dim = match get("EMBEDDING_DIM") {
            Some(v) => Some(
                v.parse::<usize>()
                    .map_err(|_| RagError::Config(format!("EMBEDDING_DIM `{v}` is not a number")))?,
            ),
            None => None,
        };
        let exact_search = get("RAG_EXACT_SEARCH")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let cfg = Self {
            backend,
            qdrant_url: get("QDRANT_URL").unwrap_or_else(|| DEFAULT_QDRANT_URL.into()),
            qdrant_api_key: get("QDRANT_API_KEY"),
            collection: get("QDRANT_COLLECTION").unwrap_or_else(|| DEFAULT_COLLECTION.into()),
            distance: DistanceKind::Cosine,
            upsert_batch,
            exact_search,
            embedding_dim,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.backend == IndexBackend::Qdrant && self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        if self.embedding_dim == Some(0) {
            return Err(RagError::Config("embedding_dim must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_env() {
        let cfg = RagConfig::from_lookup(|_| None).unwrap();
        assert_eq!(cfg.backend, IndexBackend::Qdrant);
        assert_eq!(cfg.qdrant_url, DEFAULT_QDRANT_URL);
        assert_eq!(cfg.collection, DEFAULT_COLLECTION);
        assert!(!cfg.exact_search);
    }

    #[test]
    fn memory_backend_and_numbers_are_parsed() {
        let cfg = RagConfig::from_lookup(|k| match k {
            "VECTOR_BACKEND" => Some("memory".into()),
            "QDRANT_BATCH_SIZE" => Some("64".into()),
            "EMBEDDING_DIM" => Some("768".into()),
            "RAG_EXACT_SEARCH" => Some("true".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.backend, IndexBackend::Memory);
        assert_eq!(cfg.upsert_batch, 64);
        assert_eq!(cfg.embedding_dim, Some(768));
        assert!(cfg.exact_search);
    }

    #[test]
    fn zero_batch_is_rejected() {
        let res = RagConfig::from_lookup(|k| (k == "QDRANT_BATCH_SIZE").then(|| "0".into()));
        assert!(matches!(res, Err(RagError::Config(_))));
    }
}
