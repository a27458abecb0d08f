//! Typed error for the contextor crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Request rejected before any retrieval (blank query, bad parameters).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Vector index or embedding provider unreachable; callers degrade to empty context.
    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(#[source] rag_store::RagError),

    /// Language-model provider failed while producing the answer.
    #[error("generation failed: {0}")]
    GenerationFailed(#[source] ai_llm_service::AiLlmError),

    /// Streaming receiver was dropped (client disconnected).
    #[error("stream receiver closed")]
    ClientGone,

    /// An event was emitted out of protocol order.
    #[error("stream protocol violation: {0}")]
    StreamState(&'static str),

    /// Invalid pipeline configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl From<rag_store::RagError> for ContextorError {
    fn from(e: rag_store::RagError) -> Self {
        ContextorError::RetrievalUnavailable(e)
    }
}
