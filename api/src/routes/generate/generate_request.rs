use serde::{Deserialize, Serialize};

/// Request payload for /api/generate and /api/generate/stream.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub prompt: String,
    /// `true` answers with the SSE stream instead of JSON.
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub response: String,
    pub model: String,
}
