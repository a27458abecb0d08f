//! Embedding provider backed by the shared [`LlmServiceProfiles`].

use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use tracing::debug;

use crate::embed::{EmbedFuture, EmbeddingsProvider};
use crate::errors::RagError;

/// Uses the `embedding` profile of [`LlmServiceProfiles`] (Ollama or OpenAI).
#[derive(Clone, Debug)]
pub struct ServiceEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected embedding dimension, checked on every call when set.
    dim: Option<usize>,
}

impl ServiceEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>, dim: Option<usize>) -> Self {
        Self { svc, dim }
    }

    pub fn model(&self) -> &str {
        &self.svc.profiles().2.model
    }

    fn check_dim(&self, v: &[f32]) -> Result<(), RagError> {
        match self.dim {
            Some(want) if v.len() != want => Err(RagError::VectorSizeMismatch {
                got: v.len(),
                want,
            }),
            _ => Ok(()),
        }
    }
}

impl EmbeddingsProvider for ServiceEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
        Box::pin(async move {
            let v = self.svc.embed(text).await?;
            self.check_dim(&v)?;
            Ok(v)
        })
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            debug!(target: "rag_store::embed", batch = texts.len(), "embedding batch");
            let vs = self.svc.embed_batch(texts).await?;
            for v in &vs {
                self.check_dim(v)?;
            }
            Ok(vs)
        })
    }
}
