//! Ingestion: flatten metadata → embed in batches → upsert.
//!
//! Index contents are produced by the external report chunkers; this is the
//! write path they (and the management API) call.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::embed::EmbeddingsProvider;
use crate::errors::RagError;
use crate::index::VectorIndex;
use crate::record::{IndexRecord, chunk_id_for, flatten_metadata};

/// Texts embedded per provider call.
const EMBED_BATCH: usize = 32;

/// One document as supplied by a producer.
#[derive(Clone, Debug, Deserialize)]
pub struct IngestDoc {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub metadata: Value,
}

/// Converts producer documents to index records; ids default to a content hash.
pub fn to_records(docs: Vec<IngestDoc>) -> Result<Vec<IndexRecord>, RagError> {
    docs.into_iter()
        .enumerate()
        .map(|(i, d)| {
            if d.text.trim().is_empty() {
                return Err(RagError::InvalidRecord(format!("document #{i} has empty text")));
            }
            let id = d
                .id
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| chunk_id_for(&d.text));
            Ok(IndexRecord {
                id,
                metadata: flatten_metadata(&d.metadata),
                text: d.text,
            })
        })
        .collect()
}

/// Embeds and upserts `docs` into `collection`; returns the number written.
pub async fn ingest(
    index: &dyn VectorIndex,
    embedder: &dyn EmbeddingsProvider,
    collection: &str,
    docs: Vec<IngestDoc>,
) -> Result<usize, RagError> {
    let records = to_records(docs)?;
    if records.is_empty() {
        return Ok(0);
    }

    let mut written = 0usize;
    for chunk in records.chunks(EMBED_BATCH) {
        let texts: Vec<String> = chunk.iter().map(|r| r.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;
        if vectors.len() != chunk.len() {
            return Err(RagError::Embedding(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                chunk.len()
            )));
        }
        if let Some(dim) = vectors.first().map(Vec::len) {
            index.ensure_collection(collection, dim).await?;
        }
        written += index.add(collection, chunk, &vectors).await?;
        debug!(target: "rag_store::ingest", collection, written, "batch stored");
    }

    info!(target: "rag_store::ingest", collection, written, "ingestion finished");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::embed::EmbedFuture;
    use crate::memory::MemoryIndex;
    use crate::record::MetaValue;

    struct LenEmbedder;

    impl EmbeddingsProvider for LenEmbedder {
        fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
            Box::pin(async move { Ok(vec![text.len() as f32, 1.0]) })
        }
    }

    #[tokio::test]
    async fn ingest_flattens_and_defaults_ids() {
        let idx = MemoryIndex::new();
        let docs = vec![
            IngestDoc {
                id: None,
                text: "Rajasthan stage of extraction 148%".into(),
                metadata: json!({"state": "Rajasthan", "extraction": {"stage": 148.0}}),
            },
            IngestDoc {
                id: Some("custom".into()),
                text: "Punjab is over-exploited".into(),
                metadata: json!({"state": "Punjab"}),
            },
        ];
        let n = ingest(&idx, &LenEmbedder, "gw", docs).await.unwrap();
        assert_eq!(n, 2);
        assert_eq!(idx.count("gw").await.unwrap(), 2);

        let hits = idx.query("gw", &[24.0, 1.0], 5, None).await.unwrap();
        let custom = hits.iter().find(|h| h.id == "custom").unwrap();
        assert_eq!(custom.metadata.get("state"), Some(&MetaValue::from("Punjab")));
        let hashed = hits.iter().find(|h| h.id != "custom").unwrap();
        assert!(hashed.id.starts_with("doc-"));
        assert!(hashed.metadata.contains_key("extraction_stage"));
    }

    #[test]
    fn empty_text_is_rejected() {
        let res = to_records(vec![IngestDoc {
            id: None,
            text: "  ".into(),
            metadata: Value::Null,
        }]);
        assert!(matches!(res, Err(RagError::InvalidRecord(_))));
    }
}
