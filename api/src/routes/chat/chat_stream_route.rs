//! POST /api/chat/stream: the chat answer as server-sent events.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::Response};
use contextor::ChatRequest;
use tracing::debug;

use crate::{
    core::{
        app_state::AppState,
        http::{request_id, sse},
    },
    error_handler::AppResult,
};

/// Emits `sources`, then `token`s, then `suggestions` and `done`; an `error`
/// event replaces the remainder on failure. A blank query is rejected with 400
/// before the stream opens.
pub async fn chat_stream_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> AppResult<Response> {
    debug!(
        request_id = %request_id(&headers),
        query_len = body.query.len(),
        "chat_stream_route: start"
    );
    let rx = state.pipeline.answer_stream(body)?;
    Ok(sse::event_stream(rx, state.config.keep_alive()))
}
