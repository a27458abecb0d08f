//! POST /api/collections/{name}/query: nearest neighbours of a query text.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
};
use tracing::debug;

use crate::{
    core::{app_state::AppState, http::request_id},
    error_handler::{AppError, AppResult},
    routes::collections::{
        collection_request::QueryCollectionRequest,
        collection_response::{QueryCollectionResponse, QueryHit},
        collections_route::checked_name,
    },
};

/// Upper bound on `n_results`.
const MAX_RESULTS: usize = 100;

/// Results are ascending by distance. An unknown collection is 404.
pub async fn query_collection_route(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<QueryCollectionRequest>,
) -> AppResult<Json<QueryCollectionResponse>> {
    let name = checked_name(name)?;
    if body.query.trim().is_empty() {
        return Err(AppError::BadRequest("no query provided".into()));
    }
    let k = body.n_results.clamp(1, MAX_RESULTS);
    let filter = body.filters.to_meta_filter();
    debug!(request_id = %request_id(&headers), collection = %name, k, filtered = filter.is_some(), "query_collection_route: start");

    let index = state.index.get().await?;
    let vector = state.embedder.embed(&body.query).await?;
    let hits = index.query(&name, &vector, k, filter.as_ref()).await?;

    Ok(Json(QueryCollectionResponse {
        results: hits
            .into_iter()
            .map(|c| QueryHit {
                id: c.id,
                document: c.text,
                metadata: c.metadata,
                distance: c.distance,
            })
            .collect(),
    }))
}
