use ai_llm_service::AiLlmError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contextor::ContextorError;
use rag_store::RagError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use viz_synth::SynthError;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("config error: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener on {addr}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Rich HTTP error mapped from lower layers with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn http(status: StatusCode, code: &'static str, message: impl ToString) -> Self {
        AppError::Http {
            status,
            code,
            message: message.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Http { status, .. } => *status,
            AppError::Config(_) | AppError::Bind { .. } | AppError::Server(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind { .. } => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Http { code, .. } => code,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "request failed");
        } else {
            warn!(code = self.error_code(), error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<AiLlmError> for AppError {
    fn from(err: AiLlmError) -> Self {
        match err {
            AiLlmError::Timeout(_) => AppError::http(StatusCode::GATEWAY_TIMEOUT, "LLM_TIMEOUT", err),
            AiLlmError::Config(_) => AppError::Config(err.to_string()),
            _ => AppError::http(StatusCode::BAD_GATEWAY, "LLM_ERROR", err),
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        match err {
            RagError::CollectionNotFound(name) => AppError::NotFound(format!("collection `{name}`")),
            RagError::InvalidRecord(_) | RagError::VectorSizeMismatch { .. } | RagError::Parse(_) => {
                AppError::http(StatusCode::BAD_REQUEST, "INVALID_RECORD", err)
            }
            RagError::Embedding(_) => AppError::http(StatusCode::BAD_GATEWAY, "EMBEDDING_FAILED", err),
            RagError::Unavailable(_) | RagError::Qdrant(_) => {
                AppError::http(StatusCode::SERVICE_UNAVAILABLE, "VECTOR_INDEX_UNAVAILABLE", err)
            }
            RagError::Config(_) => AppError::Config(err.to_string()),
        }
    }
}

impl From<ContextorError> for AppError {
    fn from(err: ContextorError) -> Self {
        match err {
            ContextorError::InvalidInput(msg) => AppError::http(StatusCode::BAD_REQUEST, "INVALID_INPUT", msg),
            ContextorError::GenerationFailed(AiLlmError::Timeout(d)) => AppError::http(
                StatusCode::GATEWAY_TIMEOUT,
                "GENERATION_TIMEOUT",
                format!("the language model did not answer within {d:?}"),
            ),
            ContextorError::GenerationFailed(_) => {
                AppError::http(StatusCode::BAD_GATEWAY, "GENERATION_FAILED", err)
            }
            ContextorError::RetrievalUnavailable(_) => {
                AppError::http(StatusCode::SERVICE_UNAVAILABLE, "RETRIEVAL_UNAVAILABLE", err)
            }
            ContextorError::Config(_) => AppError::Config(err.to_string()),
            ContextorError::ClientGone | ContextorError::StreamState(_) => {
                AppError::http(StatusCode::INTERNAL_SERVER_ERROR, "STREAM_ERROR", err)
            }
        }
    }
}

impl From<SynthError> for AppError {
    fn from(err: SynthError) -> Self {
        let code = match &err {
            SynthError::UnknownTool(_) => "UNKNOWN_TOOL",
            SynthError::Decode { .. } => "INVALID_TOOL_RESULT",
            SynthError::InvalidInput(_) => "INVALID_INPUT",
            SynthError::Executor(_) | SynthError::Http(_) => "TOOL_BACKEND_FAILED",
        };
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        AppError::http(status, code, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let e = AppError::from(ContextorError::InvalidInput("query must not be empty".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(e.error_code(), "INVALID_INPUT");

        let e = AppError::from(ContextorError::GenerationFailed(AiLlmError::Timeout(Duration::from_secs(3))));
        assert_eq!(e.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let e = AppError::from(RagError::CollectionNotFound("gw".into()));
        assert_eq!(e.status_code(), StatusCode::NOT_FOUND);

        let e = AppError::from(RagError::Unavailable("refused".into()));
        assert_eq!(e.error_code(), "VECTOR_INDEX_UNAVAILABLE");
    }

    #[test]
    fn tool_errors_split_client_and_backend() {
        let e = AppError::from(SynthError::UnknownTool("drop_tables".into()));
        assert_eq!((e.status_code(), e.error_code()), (StatusCode::BAD_REQUEST, "UNKNOWN_TOOL"));

        let e = AppError::from(SynthError::Executor("503".into()));
        assert_eq!(e.status_code(), StatusCode::BAD_GATEWAY);
    }
}
