//! GET /health: liveness plus reachability of the model and index backends.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::debug;

use crate::{core::app_state::AppState, routes::health::health_response::HealthResponse};

/// Never fails: unreachable dependencies are reported, not raised.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (ollama, providers) = match &state.llm {
        Some(llm) => {
            let statuses = llm.health_all().await;
            let label = if !statuses.is_empty() && statuses.iter().all(|s| s.ok) {
                "connected"
            } else {
                "disconnected"
            };
            (label, statuses)
        }
        None => ("unconfigured", Vec::new()),
    };

    let (vector_index, vector_backend) = match state.index.get().await {
        Ok(index) => match index.list_collections().await {
            Ok(_) => ("available", Some(index.backend())),
            Err(e) => {
                debug!(error = %e, "health: index probe failed");
                ("unavailable", Some(index.backend()))
            }
        },
        Err(e) => {
            debug!(error = %e, "health: index connect failed");
            ("unavailable", None)
        }
    };

    Json(HealthResponse {
        status: "ok",
        ollama,
        vector_index,
        vector_backend,
        embed_model: state.embed_model.clone(),
        providers,
    })
}
