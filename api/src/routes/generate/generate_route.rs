//! Raw prompt passthrough to the answer model, without retrieval.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use contextor::{ContextorError, EventSink, RagPipeline};
use tracing::{Instrument, debug, info_span};

use crate::{
    core::{
        app_state::AppState,
        http::{request_id, sse},
    },
    error_handler::{AppError, AppResult},
    routes::generate::generate_request::{GenerateRequest, GenerateResponse},
};

/// Handler: POST /api/generate (`"stream": true` behaves like /api/generate/stream)
pub async fn generate_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> AppResult<Response> {
    let prompt = checked_prompt(body.prompt)?;
    debug!(request_id = %request_id(&headers), stream = body.stream, "generate_route: start");
    if body.stream {
        return Ok(spawn_stream(&state, prompt));
    }

    let response = state.pipeline.generator().generate_raw(&prompt).await?;
    Ok(Json(GenerateResponse {
        response,
        model: state.chat_model.clone(),
    })
    .into_response())
}

/// Handler: POST /api/generate/stream. Emits `token`* then `done`, or `error`.
pub async fn generate_stream_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GenerateRequest>,
) -> AppResult<Response> {
    let prompt = checked_prompt(body.prompt)?;
    debug!(request_id = %request_id(&headers), "generate_stream_route: start");
    Ok(spawn_stream(&state, prompt))
}

fn checked_prompt(prompt: String) -> AppResult<String> {
    if prompt.trim().is_empty() {
        return Err(AppError::BadRequest("no prompt provided".into()));
    }
    Ok(prompt)
}

fn spawn_stream(state: &AppState, prompt: String) -> Response {
    let (mut sink, rx) = EventSink::channel();
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(
        async move {
            let outcome = produce(&pipeline, &prompt, &mut sink).await;
            sse::finish(outcome, &mut sink, "generate").await;
        }
        .instrument(info_span!("generate_stream")),
    );
    sse::event_stream(rx, state.config.keep_alive())
}

async fn produce(pipeline: &RagPipeline, prompt: &str, sink: &mut EventSink) -> Result<(), ContextorError> {
    sink.begin_plain()?;
    pipeline.generator().generate_raw_streaming(prompt, sink).await?;
    sink.done().await
}
