//! Shared language-model and embedding clients.
//!
//! - [`service_profiles::LlmServiceProfiles`] is the entry point: construct it
//!   once, wrap it in `Arc`, and hand clones to the retrieval and generation layers.
//! - Chat is available both as a single completion and as an ordered token stream.
//! - Embeddings are available for single texts and batches.

pub mod chat;
pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use chat::{ChatMessage, ChatRole, TokenStream};
pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::AiLlmError;
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
