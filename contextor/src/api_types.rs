//! Public request/response types re-used by the HTTP layer.

use ai_llm_service::ChatMessage;
use rag_store::{MetaFilter, Metadata, RetrievedChunk, clamp_snippet};
use serde::{Deserialize, Deserializer, Serialize};

/// Maximum characters of chunk text returned as a source snippet.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// One prior turn of the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: String,
    pub content: String,
}

impl HistoryMessage {
    /// `assistant`/`bot`/`model` map to the assistant role; everything else is the user.
    pub fn to_chat(&self) -> ChatMessage {
        match self.role.to_ascii_lowercase().as_str() {
            "assistant" | "bot" | "model" => ChatMessage::assistant(self.content.clone()),
            _ => ChatMessage::user(self.content.clone()),
        }
    }
}

/// Optional metadata restrictions for retrieval.
///
/// # Example
/// ```
/// use contextor::QueryFilters;
/// let f: QueryFilters = serde_json::from_str(r#"{"state":"Gujarat","year":2023}"#).unwrap();
/// assert_eq!(f.year.as_deref(), Some("2023"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categorization: Option<String>,
    #[serde(default, alias = "sourceType", skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
}

impl QueryFilters {
    /// Conjunction of every present field (blank strings count as absent).
    pub fn to_meta_filter(&self) -> Option<MetaFilter> {
        let fields = [
            ("state", &self.state),
            ("year", &self.year),
            ("source_type", &self.source_type),
            ("categorization", &self.categorization),
            ("district", &self.district),
            ("block", &self.block),
        ];
        MetaFilter::all(
            fields
                .into_iter()
                .filter_map(|(k, v)| present(v).map(|v| MetaFilter::eq(k, v)))
                .collect(),
        )
    }

    pub fn has_sub_state_scope(&self) -> bool {
        present(&self.district).is_some() || present(&self.block).is_some()
    }
}

/// Trimmed, non-empty value of an optional filter field.
pub(crate) fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        S(String),
        N(serde_json::Number),
    }
    Ok(Option::<Raw>::deserialize(d)?.map(|r| match r {
        Raw::S(s) => s,
        Raw::N(n) => n.to_string(),
    }))
}

/// A chat question.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
    #[serde(default, alias = "topK", skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub filters: QueryFilters,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_filters(mut self, filters: QueryFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// A cited source as returned to clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceItem {
    pub id: String,
    pub snippet: String,
    pub metadata: Metadata,
    /// `1 - distance` of the chunk.
    pub relevance: f32,
}

impl From<&RetrievedChunk> for SourceItem {
    fn from(c: &RetrievedChunk) -> Self {
        Self {
            id: c.id.clone(),
            snippet: clamp_snippet(&c.text, SNIPPET_MAX_CHARS),
            metadata: c.metadata.clone(),
            relevance: c.relevance(),
        }
    }
}

/// Batch answer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<SourceItem>,
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_camel_case_aliases() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"query":"q","topK":7,"filters":{"state":"Gujarat","sourceType":"annexure_3a"}}"#,
        )
        .unwrap();
        assert_eq!(req.top_k, Some(7));
        assert_eq!(req.filters.source_type.as_deref(), Some("annexure_3a"));
    }

    #[test]
    fn single_filter_is_unwrapped_and_many_are_conjoined() {
        let one = QueryFilters {
            state: Some("Gujarat".into()),
            ..Default::default()
        };
        assert!(matches!(one.to_meta_filter(), Some(MetaFilter::Eq { .. })));

        let two = QueryFilters {
            state: Some("Gujarat".into()),
            year: Some("2023".into()),
            district: Some(" ".into()),
            ..Default::default()
        };
        match two.to_meta_filter() {
            Some(MetaFilter::And(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected conjunction, got {other:?}"),
        }
        assert!(QueryFilters::default().to_meta_filter().is_none());
    }

    #[test]
    fn source_snippet_is_clamped_and_relevance_derived() {
        let chunk = RetrievedChunk {
            id: "c1".into(),
            text: "x".repeat(500),
            metadata: Metadata::new(),
            distance: 0.3,
        };
        let s = SourceItem::from(&chunk);
        assert_eq!(s.snippet.chars().count(), SNIPPET_MAX_CHARS);
        assert!((s.relevance - 0.7).abs() < 1e-6);
    }

    #[test]
    fn history_roles_map_to_chat_roles() {
        let h = HistoryMessage {
            role: "bot".into(),
            content: "hi".into(),
        };
        assert_eq!(h.to_chat(), ChatMessage::assistant("hi"));
    }
}
