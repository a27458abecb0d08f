//! Collection lifecycle: list, create, delete.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use tracing::{debug, info};

use crate::{
    core::{
        app_state::AppState,
        http::{request_id, response_envelope::ApiResponse},
    },
    error_handler::{AppError, AppResult},
    routes::collections::collection_response::{CollectionStatus, CollectionsList},
};

/// Text embedded once to learn the provider's vector size.
const DIMENSION_PROBE: &str = "groundwater";

/// Handler: GET /api/collections
pub async fn list_collections_route(State(state): State<Arc<AppState>>) -> AppResult<Response> {
    let index = state.index.get().await?;
    let collections = index.list_collections().await?;
    Ok(ApiResponse::ok(CollectionsList {
        collections,
        backend: index.backend(),
    }))
}

/// Handler: POST /api/collections/{name}
///
/// Idempotent. The vector size comes from `EMBEDDING_DIM` when configured,
/// otherwise from one probe embedding.
pub async fn create_collection_route(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let name = checked_name(name)?;
    let index = state.index.get().await?;
    let dim = match state.index.config().embedding_dim {
        Some(dim) => dim,
        None => state.embedder.embed(DIMENSION_PROBE).await?.len(),
    };
    debug!(request_id = %request_id(&headers), collection = %name, dim, "create_collection_route: start");

    index.ensure_collection(&name, dim).await?;
    let count = index.count(&name).await?;
    info!(collection = %name, count, "collection ready");
    Ok(ApiResponse::ok(CollectionStatus {
        status: "created",
        collection: name,
        count,
    }))
}

/// Handler: DELETE /api/collections/{name}
pub async fn delete_collection_route(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> AppResult<Response> {
    let name = checked_name(name)?;
    let index = state.index.get().await?;
    if !index.delete_collection(&name).await? {
        return Err(AppError::NotFound(format!("collection `{name}`")));
    }
    info!(collection = %name, "collection deleted");
    Ok(ApiResponse::ok(CollectionStatus {
        status: "deleted",
        collection: name,
        count: 0,
    }))
}

pub(crate) fn checked_name(name: String) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("collection name must not be empty".into()));
    }
    Ok(trimmed.to_string())
}
