//! POST /api/embed: raw embeddings from the configured provider.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::request_id},
    error_handler::{AppError, AppResult},
    routes::embed::embed_request::{EmbedRequest, EmbedResponse},
};

pub async fn embed_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<EmbedRequest>,
) -> AppResult<Json<EmbedResponse>> {
    let texts = body.into_texts();
    if texts.is_empty() {
        return Err(AppError::BadRequest("no texts provided".into()));
    }
    debug!(request_id = %request_id(&headers), count = texts.len(), "embed_route: start");

    let embeddings = state.embedder.embed_batch(&texts).await?;
    let dimension = embeddings.first().map_or(0, Vec::len);
    Ok(Json(EmbedResponse {
        count: embeddings.len(),
        dimension,
        embeddings,
    }))
}
