use contextor::QueryFilters;
use serde::Deserialize;
use serde_json::Value;

/// Request payload for POST /api/collections/{name}/add.
#[derive(Debug, Deserialize)]
pub struct AddDocumentsRequest {
    #[serde(default, alias = "documents")]
    pub texts: Vec<String>,
    /// Defaults to a content hash per text.
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    /// Arbitrary JSON per text; nested objects are flattened on write.
    #[serde(default)]
    pub metadatas: Option<Vec<Value>>,
}

/// Request payload for POST /api/collections/{name}/query.
#[derive(Debug, Deserialize)]
pub struct QueryCollectionRequest {
    #[serde(default, alias = "text")]
    pub query: String,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
    #[serde(default)]
    pub filters: QueryFilters,
}

fn default_n_results() -> usize {
    3
}
