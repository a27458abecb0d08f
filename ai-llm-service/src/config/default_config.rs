//! Default LLM configs resolved from environment variables.
//!
//! Three roles are produced for the active provider (`LLM_KIND`):
//!
//! - **Slow**      → answer generation (quality first)
//! - **Fast**      → follow-up suggestions and other short side tasks
//! - **Embedding** → query/document embeddings
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = `ollama` (default) or `openai`
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT` (default `http://localhost:11434`)
//! - `OLLAMA_MODEL` (default `gemma3:12b`)
//! - `OLLAMA_MODEL_FAST` (defaults to `OLLAMA_MODEL`)
//! - `EMBEDDING_MODEL` or `EMBED_MODEL` (default `embeddinggemma`)
//!
//! OpenAI:
//! - `OPENAI_API_KEY` (required), `OPENAI_BASE_URL` (default `https://api.openai.com`)
//! - `OPENAI_MODEL` (required), `OPENAI_MODEL_FAST` (defaults to `OPENAI_MODEL`)
//! - `OPENAI_EMBEDDING_MODEL` (default `text-embedding-3-small`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{ConfigError, Result, env_opt_u32, must_env, opt_env, validate_http_endpoint},
};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:12b";
pub const DEFAULT_EMBED_MODEL: &str = "embeddinggemma";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_EMBED_MODEL: &str = "text-embedding-3-small";

/// The three model profiles used by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileConfigs {
    pub slow: LlmModelConfig,
    pub fast: LlmModelConfig,
    pub embedding: LlmModelConfig,
}

impl ProfileConfigs {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|k: &str| std::env::var(k).ok())
    }

    /// Resolves all three profiles through `lookup`.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match opt_env(lookup, "LLM_KIND") {
            Some(kind) => kind.parse::<LlmProvider>()?,
            None => LlmProvider::Ollama,
        };
        match provider {
            LlmProvider::Ollama => Ok(Self {
                slow: config_ollama_slow(lookup)?,
                fast: config_ollama_fast(lookup)?,
                embedding: config_ollama_embedding(lookup)?,
            }),
            LlmProvider::OpenAI => config_openai(lookup),
        }
    }
}

/// Resolves the Ollama endpoint.
///
/// Precedence: `OLLAMA_URL`, then `OLLAMA_PORT` → `http://localhost:{port}`,
/// then [`DEFAULT_OLLAMA_URL`].
fn ollama_endpoint<F>(lookup: &F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = opt_env(lookup, "OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env(lookup, "OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Ok(DEFAULT_OLLAMA_URL.to_string())
}

/// Slow/quality Ollama model used for answers.
///
/// # Defaults
/// - `temperature = Some(0.2)`
/// - `timeout_secs = Some(600)`
pub fn config_ollama_slow<F>(lookup: &F) -> Result<LlmModelConfig>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model: opt_env(lookup, "OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into()),
        endpoint: ollama_endpoint(lookup)?,
        api_key: None,
        max_tokens: env_opt_u32(lookup, "LLM_MAX_TOKENS")?,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(600),
    })
}

/// Fast Ollama model used for suggestions.
pub fn config_ollama_fast<F>(lookup: &F) -> Result<LlmModelConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let model = opt_env(lookup, "OLLAMA_MODEL_FAST")
        .or_else(|| opt_env(lookup, "OLLAMA_MODEL"))
        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.into());
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint: ollama_endpoint(lookup)?,
        api_key: None,
        max_tokens: Some(256),
        temperature: Some(0.7),
        top_p: Some(0.9),
        timeout_secs: Some(120),
    })
}

/// Ollama embedding model.
pub fn config_ollama_embedding<F>(lookup: &F) -> Result<LlmModelConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let model = opt_env(lookup, "EMBEDDING_MODEL")
        .or_else(|| opt_env(lookup, "EMBED_MODEL"))
        .unwrap_or_else(|| DEFAULT_EMBED_MODEL.into());
    Ok(LlmModelConfig {
        provider: LlmProvider::Ollama,
        model,
        endpoint: ollama_endpoint(lookup)?,
        api_key: None,
        max_tokens: None,
        temperature: Some(0.0),
        top_p: None,
        timeout_secs: Some(30),
    })
}

fn config_openai<F>(lookup: &F) -> Result<ProfileConfigs>
where
    F: Fn(&str) -> Option<String>,
{
    let api_key = must_env(lookup, "OPENAI_API_KEY")?;
    let endpoint = opt_env(lookup, "OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.into());
    validate_http_endpoint("OPENAI_BASE_URL", &endpoint)?;
    let model = must_env(lookup, "OPENAI_MODEL")?;
    let fast_model = opt_env(lookup, "OPENAI_MODEL_FAST").unwrap_or_else(|| model.clone());
    let embed_model = opt_env(lookup, "OPENAI_EMBEDDING_MODEL")
        .unwrap_or_else(|| DEFAULT_OPENAI_EMBED_MODEL.into());
    let max_tokens = env_opt_u32(lookup, "LLM_MAX_TOKENS")?;

    let base = LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key: Some(api_key),
        max_tokens,
        temperature: Some(0.2),
        top_p: None,
        timeout_secs: Some(120),
    };
    Ok(ProfileConfigs {
        fast: LlmModelConfig {
            model: fast_model,
            max_tokens: Some(256),
            temperature: Some(0.7),
            ..base.clone()
        },
        embedding: LlmModelConfig {
            model: embed_model,
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(30),
            ..base.clone()
        },
        slow: base,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn ollama_defaults_apply_when_env_is_empty() {
        let cfgs = ProfileConfigs::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(cfgs.slow.endpoint, DEFAULT_OLLAMA_URL);
        assert_eq!(cfgs.slow.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(cfgs.fast.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(cfgs.embedding.model, DEFAULT_EMBED_MODEL);
    }

    #[test]
    fn port_builds_localhost_endpoint_and_embed_alias_is_honoured() {
        let lookup = lookup_from(&[("OLLAMA_PORT", "11500"), ("EMBED_MODEL", "nomic-embed-text")]);
        let cfgs = ProfileConfigs::from_lookup(&lookup).unwrap();
        assert_eq!(cfgs.slow.endpoint, "http://localhost:11500");
        assert_eq!(cfgs.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn openai_requires_api_key() {
        let lookup = lookup_from(&[("LLM_KIND", "openai"), ("OPENAI_MODEL", "gpt-4o-mini")]);
        assert!(ProfileConfigs::from_lookup(&lookup).is_err());

        let lookup = lookup_from(&[
            ("LLM_KIND", "openai"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("OPENAI_API_KEY", "sk-test"),
        ]);
        let cfgs = ProfileConfigs::from_lookup(&lookup).unwrap();
        assert_eq!(cfgs.slow.provider, LlmProvider::OpenAI);
        assert_eq!(cfgs.embedding.model, DEFAULT_OPENAI_EMBED_MODEL);
    }

    #[test]
    fn bad_port_is_rejected() {
        let lookup = lookup_from(&[("OLLAMA_PORT", "not-a-port")]);
        assert!(ProfileConfigs::from_lookup(&lookup).is_err());
    }
}
