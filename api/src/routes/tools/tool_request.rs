use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use viz_synth::{TextSummary, ToolName, Visualization};

/// Request payload for /api/tools/query and /api/tools/stream.
#[derive(Debug, Deserialize)]
pub struct ToolQueryRequest {
    /// One of the data tools, e.g. `get_top_locations`.
    pub tool: String,
    #[serde(default = "empty_object")]
    pub arguments: Value,
    /// Result already computed by the caller; skips the tool backend.
    #[serde(default)]
    pub result: Option<Value>,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// Response payload for /api/tools/query.
#[derive(Debug, Serialize)]
pub struct ToolQueryResponse {
    pub tool: ToolName,
    pub visualizations: Vec<Visualization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TextSummary>,
    pub suggestions: Vec<String>,
}
