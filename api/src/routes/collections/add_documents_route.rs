//! POST /api/collections/{name}/add: embed and upsert documents.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::HeaderMap,
    response::Response,
};
use rag_store::{IngestDoc, ingest};
use serde_json::Value;
use tracing::debug;

use crate::{
    core::{
        app_state::AppState,
        http::{request_id, response_envelope::ApiResponse},
    },
    error_handler::{AppError, AppResult},
    routes::collections::{
        collection_request::AddDocumentsRequest, collection_response::CollectionStatus,
        collections_route::checked_name,
    },
};

pub async fn add_documents_route(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<AddDocumentsRequest>,
) -> AppResult<Response> {
    let name = checked_name(name)?;
    let docs = to_docs(body)?;
    debug!(request_id = %request_id(&headers), collection = %name, docs = docs.len(), "add_documents_route: start");

    let index = state.index.get().await?;
    let written = ingest(index.as_ref(), state.embedder.as_ref(), &name, docs).await?;
    Ok(ApiResponse::ok(CollectionStatus {
        status: "added",
        collection: name,
        count: written as u64,
    }))
}

fn to_docs(body: AddDocumentsRequest) -> AppResult<Vec<IngestDoc>> {
    let n = body.texts.len();
    if n == 0 {
        return Err(AppError::BadRequest("no texts provided".into()));
    }
    if let Some(ids) = &body.ids {
        if ids.len() != n {
            return Err(AppError::BadRequest(format!("{} ids for {n} texts", ids.len())));
        }
    }
    if let Some(metadatas) = &body.metadatas {
        if metadatas.len() != n {
            return Err(AppError::BadRequest(format!("{} metadatas for {n} texts", metadatas.len())));
        }
    }

    let ids: Vec<Option<String>> = body
        .ids
        .map_or_else(|| vec![None; n], |v| v.into_iter().map(Some).collect());
    let metadatas = body.metadatas.unwrap_or_else(|| vec![Value::Null; n]);
    Ok(body
        .texts
        .into_iter()
        .zip(ids)
        .zip(metadatas)
        .map(|((text, id), metadata)| IngestDoc { id, text, metadata })
        .collect())
}
