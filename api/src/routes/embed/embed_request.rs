use serde::{Deserialize, Serialize};

/// A single text or a list of texts.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Request payload for /api/embed; `texts` wins over `input`.
#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub texts: Option<OneOrMany>,
    #[serde(default)]
    pub input: Option<OneOrMany>,
}

impl EmbedRequest {
    /// Non-blank texts in request order.
    pub fn into_texts(self) -> Vec<String> {
        self.texts
            .or(self.input)
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub count: usize,
    pub dimension: usize,
}
