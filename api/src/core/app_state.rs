use std::{fmt::Display, sync::Arc, time::Duration};

use ai_llm_service::LlmServiceProfiles;
use contextor::{ChatBackend, ContextorConfig, RagPipeline};
use rag_store::{EmbeddingsProvider, IndexHandle, RagConfig, ServiceEmbedder};
use tracing::info;
use viz_synth::{HttpToolExecutor, ToolExecutor};

use crate::error_handler::AppError;

pub const DEFAULT_API_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

/// Listener and transport settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiConfig {
    /// `host:port` to bind.
    pub address: String,
    /// Interval between SSE keep-alive comments.
    pub keep_alive_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_API_ADDRESS.to_string(),
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Reads `API_ADDRESS` and `SSE_KEEP_ALIVE_SECS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let keep_alive_secs = match get("SSE_KEEP_ALIVE_SECS") {
            Some(v) => match v.parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::Config(format!(
                        "SSE_KEEP_ALIVE_SECS must be a positive integer, got `{v}`"
                    )));
                }
            },
            None => DEFAULT_KEEP_ALIVE_SECS,
        };
        Ok(Self {
            address: get("API_ADDRESS").unwrap_or_else(|| DEFAULT_API_ADDRESS.to_string()),
            keep_alive_secs,
        })
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<RagPipeline>,
    pub index: Arc<IndexHandle>,
    pub embedder: Arc<dyn EmbeddingsProvider>,
    /// Data-tool backend; `None` means tool requests must carry a precomputed `result`.
    pub tools: Option<Arc<dyn ToolExecutor>>,
    /// Provider profiles for `/health`; absent when handlers run over injected backends.
    pub llm: Option<Arc<LlmServiceProfiles>>,
    pub chat_model: String,
    pub embed_model: String,
}

impl AppState {
    /// State over explicit collaborators.
    pub fn new(
        config: ApiConfig,
        pipeline_cfg: ContextorConfig,
        index: Arc<IndexHandle>,
        embedder: Arc<dyn EmbeddingsProvider>,
        chat: Arc<dyn ChatBackend>,
    ) -> Result<Self, AppError> {
        let pipeline = RagPipeline::new(pipeline_cfg, Arc::clone(&index), Arc::clone(&embedder), chat)
            .map_err(config_error)?;
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            index,
            embedder,
            tools: None,
            llm: None,
            chat_model: "unknown".to_string(),
            embed_model: "unknown".to_string(),
        })
    }

    pub fn with_tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Load shared state from environment variables.
    ///
    /// Nothing here touches the network: the index connects on first use and
    /// provider clients are created lazily by the profiles.
    pub fn from_env() -> Result<Self, AppError> {
        let config = ApiConfig::from_env()?;
        let llm = Arc::new(LlmServiceProfiles::from_env().map_err(config_error)?);
        let rag_cfg = RagConfig::from_env().map_err(config_error)?;
        let pipeline_cfg = ContextorConfig::from_env().map_err(config_error)?;
        let tools = HttpToolExecutor::from_env().map_err(config_error)?;

        let embedder = ServiceEmbedder::new(Arc::clone(&llm), rag_cfg.embedding_dim);
        let embed_model = embedder.model().to_string();
        let (_, slow, _) = llm.profiles();
        let chat_model = slow.model.clone();

        info!(
            backend = ?rag_cfg.backend,
            collection = %rag_cfg.collection,
            chat_model = %chat_model,
            embed_model = %embed_model,
            tools = tools.as_ref().map(|t| t.base()).unwrap_or("-"),
            "app state configured"
        );

        let index = Arc::new(IndexHandle::lazy(rag_cfg));
        let chat: Arc<dyn ChatBackend> = llm.clone();
        let mut state = Self::new(config, pipeline_cfg, index, Arc::new(embedder), chat)?;
        if let Some(tools) = tools {
            state = state.with_tools(Arc::new(tools));
        }
        state.llm = Some(llm);
        state.chat_model = chat_model;
        state.embed_model = embed_model;
        Ok(state)
    }
}

fn config_error(e: impl Display) -> AppError {
    AppError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_config_defaults_and_overrides() {
        assert_eq!(ApiConfig::from_lookup(|_| None).unwrap(), ApiConfig::default());

        let cfg = ApiConfig::from_lookup(|k| match k {
            "API_ADDRESS" => Some("127.0.0.1:9000".into()),
            "SSE_KEEP_ALIVE_SECS" => Some("5".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.address, "127.0.0.1:9000");
        assert_eq!(cfg.keep_alive(), Duration::from_secs(5));

        let bad = ApiConfig::from_lookup(|k| (k == "SSE_KEEP_ALIVE_SECS").then(|| "0".into()));
        assert!(matches!(bad, Err(AppError::Config(_))));
    }
}
