//! POST /api/tools/query: tool result rendered as visualization descriptors.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap};
use tracing::debug;
use viz_synth::{ToolName, follow_ups, resolve, synthesize};

use crate::{
    core::{app_state::AppState, http::request_id},
    error_handler::AppResult,
    routes::tools::tool_request::{ToolQueryRequest, ToolQueryResponse},
};

/// Handler: POST /api/tools/query
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/tools/query \
///   -H 'content-type: application/json' \
///   -d '{"tool":"get_top_locations","arguments":{"metric":"stage_of_extraction_pct","level":"district"}}'
/// ```
pub async fn tool_query_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ToolQueryRequest>,
) -> AppResult<Json<ToolQueryResponse>> {
    let request_id = request_id(&headers);
    let tool: ToolName = body.tool.parse()?;
    debug!(
        request_id = %request_id,
        tool = %tool,
        precomputed = body.result.is_some(),
        "tool_query_route: start"
    );

    let output = resolve(state.tools.as_deref(), tool, &body.arguments, body.result).await?;
    let synthesis = synthesize(&output);

    debug!(
        request_id = %request_id,
        visualizations = synthesis.visualizations.len(),
        skipped = synthesis.skipped,
        "tool_query_route: success"
    );
    Ok(Json(ToolQueryResponse {
        tool,
        suggestions: follow_ups(&output),
        visualizations: synthesis.visualizations,
        summary: synthesis.summary,
    }))
}
