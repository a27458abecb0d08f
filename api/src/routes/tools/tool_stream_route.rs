//! POST /api/tools/stream: tool call, result and visualizations as SSE.

use std::sync::Arc;

use axum::{Json, extract::State, http::HeaderMap, response::Response};
use contextor::{ContextorError, EventSink};
use tracing::{Instrument, debug, info_span, warn};
use viz_synth::{ToolExecutor, ToolName, follow_ups, resolve, synthesize};

use crate::{
    core::{
        app_state::AppState,
        http::{request_id, sse},
    },
    error_handler::AppResult,
    routes::tools::tool_request::ToolQueryRequest,
};

/// Event order: `tool_call` → `tool_result` → `data` → `suggestions` → `done`.
/// An unknown tool is rejected with 400 before the stream opens; a failing
/// tool backend or malformed result ends the stream with `error`.
pub async fn tool_stream_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ToolQueryRequest>,
) -> AppResult<Response> {
    let tool: ToolName = body.tool.parse()?;
    debug!(request_id = %request_id(&headers), tool = %tool, "tool_stream_route: start");

    let (mut sink, rx) = EventSink::channel();
    let tools = state.tools.clone();
    let span = info_span!("tool_stream", tool = %tool);
    tokio::spawn(
        async move {
            let outcome = produce(tools.as_deref(), tool, body, &mut sink).await;
            sse::finish(outcome, &mut sink, "tool").await;
        }
        .instrument(span),
    );
    Ok(sse::event_stream(rx, state.config.keep_alive()))
}

async fn produce(
    tools: Option<&dyn ToolExecutor>,
    tool: ToolName,
    body: ToolQueryRequest,
    sink: &mut EventSink,
) -> Result<(), ContextorError> {
    sink.tool_call(tool.as_str(), body.arguments.clone()).await?;

    let output = match resolve(tools, tool, &body.arguments, body.result).await {
        Ok(output) => output,
        Err(e) => {
            warn!(error = %e, "tool resolution failed");
            return sink.error(e.to_string()).await;
        }
    };
    sink.tool_result(tool.as_str(), output.to_value()).await?;

    let synthesis = synthesize(&output);
    match serde_json::to_value(&synthesis) {
        Ok(data) => sink.data(data).await?,
        Err(e) => return sink.error(format!("failed to encode visualizations: {e}")).await,
    }
    sink.suggestions(follow_ups(&output)).await?;
    sink.done().await
}
