use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),

    /// Tool payload does not match the typed result for that tool.
    #[error("malformed `{tool}` result: {source}")]
    Decode {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid tool request: {0}")]
    InvalidInput(String),

    #[error("tool backend error: {0}")]
    Executor(String),

    #[error("tool backend transport: {0}")]
    Http(#[from] reqwest::Error),
}

impl SynthError {
    /// Caller mistakes (as opposed to backend failures).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SynthError::UnknownTool(_) | SynthError::Decode { .. } | SynthError::InvalidInput(_)
        )
    }
}
