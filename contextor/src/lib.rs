//! RAG orchestration for the groundwater assistant.
//!
//! Public entry point: [`RagPipeline`]. A request is classified (broad vs.
//! targeted), context is retrieved from `rag-store` with one embedding per
//! query, assembled into a numbered block, and answered by the chat backend
//! either in one call ([`RagPipeline::answer`]) or as an ordered event stream
//! ([`RagPipeline::answer_stream`]).
//!
//! When the vector index is unreachable the pipeline still answers, over the
//! [`NO_CONTEXT_SENTINEL`] context and with no sources.

mod api_types;
mod assemble;
mod cfg;
mod classify;
mod error;
mod events;
mod generate;
mod llm;
mod pipeline;
pub mod prompt;
mod retrieve;

pub use api_types::{
    ChatAnswer, ChatRequest, HistoryMessage, QueryFilters, SNIPPET_MAX_CHARS, SourceItem,
};
pub use assemble::{NO_CONTEXT_SENTINEL, assemble_context};
pub use cfg::{BroadConfig, ClassifierConfig, ContextorConfig};
pub use classify::{Classification, Classifier};
pub use error::ContextorError;
pub use events::{EVENT_BUFFER, EventSink, StreamEvent};
pub use generate::{Generator, fallback_suggestions};
pub use llm::ChatBackend;
pub use pipeline::RagPipeline;
pub use retrieve::{Retrieval, Retriever, Strategy, merge_ranked};
