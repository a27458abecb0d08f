//! Shared LLM service with three profiles: `fast`, `slow`, and `embedding`.
//!
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (connect-or-reuse).
//! - `slow` answers questions, `fast` drafts suggestions, `embedding` feeds the index.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{ChatMessage, LlmServiceProfiles};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = Arc::new(LlmServiceProfiles::from_env()?);
//! let answer = svc.chat_slow(&[ChatMessage::user("Which blocks are over-exploited?")]).await?;
//! let vectors = svc.embed_batch(&["safe".to_string(), "critical".to_string()]).await?;
//! println!("{answer} / dim = {}", vectors[0].len());
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    chat::{ChatMessage, TokenStream},
    config::{default_config::ProfileConfigs, llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, Provider, ProviderError, ProviderErrorKind},
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service managing the **fast**, **slow** and **embedding** profiles.
#[derive(Debug)]
pub struct LlmServiceProfiles {
    fast: LlmModelConfig,
    slow: LlmModelConfig,
    embedding: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service with three profiles.
    ///
    /// - `slow_opt`: if `None`, falls back to `fast`.
    /// - `health_timeout_secs`: timeout for health probes.
    pub fn new(
        fast: LlmModelConfig,
        slow_opt: Option<LlmModelConfig>,
        embedding: LlmModelConfig,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let slow = slow_opt.unwrap_or_else(|| fast.clone());
        Ok(Self {
            fast,
            slow,
            embedding,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Builds all profiles from the process environment (see [`ProfileConfigs`]).
    pub fn from_env() -> Result<Self, AiLlmError> {
        Self::from_configs(ProfileConfigs::from_env()?)
    }

    pub fn from_configs(cfgs: ProfileConfigs) -> Result<Self, AiLlmError> {
        Self::new(cfgs.fast, Some(cfgs.slow), cfgs.embedding, Some(5))
    }

    /// Chat completion on the **slow** (answer) profile.
    pub async fn chat_slow(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat_with(&self.slow, messages).await
    }

    /// Chat completion on the **fast** profile.
    pub async fn chat_fast(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat_with(&self.fast, messages).await
    }

    /// Token stream on the **slow** (answer) profile.
    pub async fn stream_slow(&self, messages: &[ChatMessage]) -> Result<TokenStream, AiLlmError> {
        match self.slow.provider {
            LlmProvider::Ollama => self.get_or_init_ollama(&self.slow).await?.chat_stream(messages).await,
            LlmProvider::OpenAI => self.get_or_init_openai(&self.slow).await?.chat_stream(messages).await,
        }
    }

    /// Embeds a single text on the **embedding** profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let mut out = self.embed_batch(&[input.to_string()]).await?;
        out.pop().ok_or_else(|| {
            let provider = match self.embedding.provider {
                LlmProvider::Ollama => Provider::Ollama,
                LlmProvider::OpenAI => Provider::OpenAI,
            };
            ProviderError::new(provider, ProviderErrorKind::EmbeddingCount { expected: 1, got: 0 }).into()
        })
    }

    /// Embeds a batch of texts; output order follows input order.
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AiLlmError> {
        debug!(batch = inputs.len(), model = %self.embedding.model, "embedding batch");
        match self.embedding.provider {
            LlmProvider::Ollama => self.get_or_init_ollama(&self.embedding).await?.embed_batch(inputs).await,
            LlmProvider::OpenAI => self.get_or_init_openai(&self.embedding).await?.embed_batch(inputs).await,
        }
    }

    /// Health snapshot for all distinct profiles.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(3);
        for cfg in [&self.slow, &self.fast, &self.embedding] {
            if !list.iter().any(|c| c.endpoint == cfg.endpoint && c.model == cfg.model) {
                list.push(cfg.clone());
            }
        }
        self.health.check_many(&list).await
    }

    /// Returns the current profiles `(fast, slow, embedding)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig, &LlmModelConfig) {
        (&self.fast, &self.slow, &self.embedding)
    }

    /* --------------------- Internals --------------------- */

    async fn chat_with(&self, cfg: &LlmModelConfig, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        match cfg.provider {
            LlmProvider::Ollama => self.get_or_init_ollama(cfg).await?.chat(messages).await,
            LlmProvider::OpenAI => self.get_or_init_openai(cfg).await?.chat(messages).await,
        }
    }

    async fn get_or_init_ollama(&self, cfg: &LlmModelConfig) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }

    async fn get_or_init_openai(&self, cfg: &LlmModelConfig) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key) {
            return Ok(cli.clone());
        }
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, cli.clone());
        Ok(cli)
    }
}

/// Cache key covering every field a client bakes into its requests.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: Option<u32>,
    temperature_bits: Option<u32>,
    top_p_bits: Option<u32>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            max_tokens: cfg.max_tokens,
            temperature_bits: cfg.temperature.map(f32::to_bits),
            top_p_bits: cfg.top_p.map(f32::to_bits),
            timeout: cfg.timeout_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clients_are_cached_per_config() {
        let fast = LlmModelConfig::ollama("http://localhost:11434", "gemma3:4b");
        let slow = LlmModelConfig::ollama("http://localhost:11434", "gemma3:12b");
        let emb = LlmModelConfig::ollama("http://localhost:11434", "embeddinggemma");
        let svc = LlmServiceProfiles::new(fast.clone(), Some(slow.clone()), emb, None).unwrap();

        let a = svc.get_or_init_ollama(&fast).await.unwrap();
        let b = svc.get_or_init_ollama(&fast).await.unwrap();
        let c = svc.get_or_init_ollama(&slow).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));

        let dump = format!("{svc:?}");
        assert!(dump.contains("ClientKey"));
        assert!(dump.contains("gemma3:12b"));
    }

    #[tokio::test]
    async fn invalid_config_surfaces_as_error_not_panic() {
        let bad = LlmModelConfig::ollama("not-a-url", "gemma3:12b");
        let svc = LlmServiceProfiles::new(bad.clone(), None, bad, None).unwrap();
        assert!(svc.chat_fast(&[ChatMessage::user("hi")]).await.is_err());
    }
}
