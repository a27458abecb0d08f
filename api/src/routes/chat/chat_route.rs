//! POST /api/chat: grounded answer with sources and follow-up suggestions.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use contextor::{ChatAnswer, ChatRequest};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::request_id},
    error_handler::AppResult,
};

/// Handler: POST /api/chat
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/chat \
///   -H 'content-type: application/json' \
///   -d '{"query":"Give me an overview of Rajasthan","filters":{"state":"Rajasthan","year":"2022-2023"}}'
/// ```
pub async fn chat_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ChatRequest>,
) -> AppResult<Json<ChatAnswer>> {
    let request_id = request_id(&headers);
    debug!(
        request_id = %request_id,
        query_len = body.query.len(),
        history = body.history.len(),
        "chat_route: start"
    );

    let answer = state.pipeline.answer(&body).await?;

    debug!(
        request_id = %request_id,
        sources = answer.sources.len(),
        "chat_route: success"
    );
    Ok(Json(answer))
}
