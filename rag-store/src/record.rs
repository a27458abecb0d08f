//! Core data models used by the library.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Scalar metadata value. Nested structures never reach the index; see [`flatten_metadata`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Num(serde_json::Number),
    Str(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Num(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Loose equality used by filters: numbers compare numerically, and a number
    /// matches a string holding the same number (`2023` vs `"2023"`).
    pub fn loosely_eq(&self, other: &MetaValue) -> bool {
        match (self, other) {
            (MetaValue::Num(a), MetaValue::Num(b)) => a.as_f64() == b.as_f64(),
            (MetaValue::Str(a), MetaValue::Str(b)) => a == b,
            (MetaValue::Bool(a), MetaValue::Bool(b)) => a == b,
            (MetaValue::Num(n), MetaValue::Str(s)) | (MetaValue::Str(s), MetaValue::Num(n)) => {
                s.trim().parse::<f64>().ok() == n.as_f64()
            }
            _ => false,
        }
    }

    fn from_json_scalar(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(MetaValue::Bool(*b)),
            Value::Number(n) => Some(MetaValue::Num(n.clone())),
            Value::String(s) => Some(MetaValue::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(b) => write!(f, "{b}"),
            MetaValue::Num(n) => write!(f, "{n}"),
            MetaValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        MetaValue::Str(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        MetaValue::Str(s)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        MetaValue::Num(n.into())
    }
}

impl From<bool> for MetaValue {
    fn from(b: bool) -> Self {
        MetaValue::Bool(b)
    }
}

pub type Metadata = BTreeMap<String, MetaValue>;

/// A passage returned by the index.
///
/// `distance` is non-negative and lower means more relevant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    pub distance: f32,
}

impl RetrievedChunk {
    /// `1 - distance`; derived on demand, never stored.
    pub fn relevance(&self) -> f32 {
        1.0 - self.distance
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(MetaValue::as_str)
    }
}

/// A document to be written to the index (vector supplied separately).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Flattens arbitrary JSON metadata into scalar `parent_child` keys.
///
/// - nested objects: keys joined with `_`
/// - nulls: dropped
/// - arrays: scalar elements joined with `", "`; non-scalar elements dropped;
///   an array with no scalars is dropped
/// - a non-object root yields an empty map
pub fn flatten_metadata(value: &Value) -> Metadata {
    let mut out = Metadata::new();
    if let Value::Object(map) = value {
        for (k, v) in map {
            flatten_into(&mut out, k, v);
        }
    }
    out
}

fn flatten_into(out: &mut Metadata, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (k, v) in map {
                flatten_into(out, &format!("{key}_{k}"), v);
            }
        }
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(MetaValue::from_json_scalar)
                .map(|v| v.to_string())
                .collect();
            if !parts.is_empty() {
                out.insert(key.to_string(), MetaValue::Str(parts.join(", ")));
            }
        }
        scalar => {
            if let Some(v) = MetaValue::from_json_scalar(scalar) {
                out.insert(key.to_string(), v);
            }
        }
    }
}

/// Content-derived id used when a caller does not supply one.
pub fn chunk_id_for(text: &str) -> String {
    let hash = blake3::hash(text.as_bytes());
    format!("doc-{}", &hash.to_hex()[..16])
}

/// Clamps `s` to at most `max_chars` characters (char-boundary safe).
pub fn clamp_snippet(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
