//! HTTP surface of the groundwater assistant.
//!
//! [`build_router`] wires every route over a shared [`AppState`]; [`start`]
//! loads the state from the environment and serves until Ctrl+C.

use std::sync::Arc;

mod core;
mod error_handler;
mod middleware_layer;
mod routes;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use colored::Colorize;
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub use crate::core::app_state::{ApiConfig, AppState, DEFAULT_API_ADDRESS};
pub use crate::error_handler::{AppError, AppResult};

use crate::{
    middleware_layer::json_extractor::json_error_mapper,
    routes::{
        chat::{chat_route::chat_route, chat_stream_route::chat_stream_route},
        collections::{
            add_documents_route::add_documents_route,
            collections_route::{create_collection_route, delete_collection_route, list_collections_route},
            query_collection_route::query_collection_route,
        },
        embed::embed_route::embed_route,
        generate::generate_route::{generate_route, generate_stream_route},
        health::health_route::health_route,
        tools::{tool_query_route::tool_query_route, tool_stream_route::tool_stream_route},
    },
};

/// All routes with CORS, request tracing and rejection mapping applied.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_route))
        .route("/api/chat", post(chat_route))
        .route("/api/chat/stream", post(chat_stream_route))
        .route("/api/tools/query", post(tool_query_route))
        .route("/api/tools/stream", post(tool_stream_route))
        .route("/api/embed", post(embed_route))
        .route("/api/collections", get(list_collections_route))
        .route(
            "/api/collections/{name}",
            post(create_collection_route).delete(delete_collection_route),
        )
        .route("/api/collections/{name}/add", post(add_documents_route))
        .route("/api/collections/{name}/query", post(query_collection_route))
        .route("/api/generate", post(generate_route))
        .route("/api/generate/stream", post(generate_stream_route))
        .layer(middleware::from_fn(json_error_mapper))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let address = state.config.address.clone();
    let app = build_router(state);

    let listener = TcpListener::bind(&address).await.map_err(|source| AppError::Bind {
        addr: address.clone(),
        source,
    })?;
    info!(address = %address, "api listening");
    println!("{} http://{}", "listening on".green(), address.bold());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("api stopped");
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed the server keeps running.
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
