use ai_llm_service::HealthStatus;
use serde::Serialize;

/// Response payload for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `ok` while the process serves requests.
    pub status: &'static str,
    /// `connected`, `disconnected` or `unconfigured`.
    pub ollama: &'static str,
    /// `available` or `unavailable`.
    pub vector_index: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector_backend: Option<&'static str>,
    pub embed_model: String,
    /// Per-profile probe results.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<HealthStatus>,
}
