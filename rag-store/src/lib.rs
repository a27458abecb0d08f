//! Vector index layer for the groundwater assistant.
//!
//! This crate provides:
//! - [`VectorIndex`]: nearest-neighbour search over named collections, with
//!   Qdrant ([`QdrantIndex`]) and in-process ([`MemoryIndex`]) backends
//! - [`IndexHandle`]: shared, connect-once access to the configured backend
//! - [`MetaFilter`]: conjunctive equality filters over flattened metadata
//! - [`EmbeddingsProvider`]: the embedding seam used by retrieval and ingestion
//!
//! The design is flat and splits responsibilities into focused modules.

mod config;
mod embed;
mod errors;
mod filters;
mod handle;
mod index;
mod ingest;
mod memory;
mod qdrant_facade;
mod record;

pub use config::{DEFAULT_COLLECTION, DistanceKind, IndexBackend, RagConfig};
pub use embed::service::ServiceEmbedder;
pub use embed::{EmbedFuture, EmbeddingsProvider};
pub use errors::RagError;
pub use filters::{MetaFilter, to_qdrant_filter};
pub use handle::IndexHandle;
pub use index::VectorIndex;
pub use ingest::{IngestDoc, ingest, to_records};
pub use memory::MemoryIndex;
pub use qdrant_facade::QdrantIndex;
pub use record::{
    IndexRecord, MetaValue, Metadata, RetrievedChunk, chunk_id_for, clamp_snippet, flatten_metadata,
};
