use crate::config::llm_provider::LlmProvider;

/// Configuration for one model invocation profile.
///
/// # Fields
///
/// - `provider`: backend (Ollama or OpenAI).
/// - `model`: model identifier (e.g. `"gemma3:12b"`, `"embeddinggemma"`).
/// - `endpoint`: base URL of the provider; paths are appended by the services.
/// - `api_key`: required for OpenAI.
/// - `max_tokens`: generation cap, if supported.
/// - `temperature` / `top_p`: sampling knobs.
/// - `timeout_secs`: per-request HTTP timeout.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Ollama profile with provider defaults; handy for tests and local setups.
    pub fn ollama(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: endpoint.into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: Some(120),
        }
    }
}
