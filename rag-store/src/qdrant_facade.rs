//! Thin adapter around `qdrant-client` implementing [`VectorIndex`].
//!
//! All Qdrant interactions live here, hiding the builder API from the rest of
//! the workspace. Points carry the original string id in the `chunk_id`
//! payload field (Qdrant itself only accepts integers or UUIDs), the passage in
//! `text`, and every flattened metadata key alongside.

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointId, PointStruct, SearchParamsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QValue, VectorParamsBuilder, value::Kind,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DistanceKind, RagConfig};
use crate::errors::RagError;
use crate::filters::{MetaFilter, to_qdrant_filter};
use crate::index::{VectorIndex, check_add_input};
use crate::record::{IndexRecord, MetaValue, Metadata, RetrievedChunk};

const ID_FIELD: &str = "chunk_id";
const TEXT_FIELD: &str = "text";

pub struct QdrantIndex {
    client: Qdrant,
    distance: DistanceKind,
    upsert_batch: usize,
    exact: bool,
}

impl QdrantIndex {
    /// Builds the client and verifies the server answers a health check.
    pub async fn connect(cfg: &RagConfig) -> Result<Self, RagError> {
        cfg.validate()?;

        let mut builder = Qdrant::from_url(&cfg.qdrant_url);
        if let Some(key) = &cfg.qdrant_api_key {
            builder = builder.api_key(key.clone());
        }
        let client = builder
            .build()
            .map_err(|e| RagError::Unavailable(e.to_string()))?;

        client
            .health_check()
            .await
            .map_err(|e| RagError::Unavailable(format!("{}: {e}", cfg.qdrant_url)))?;

        info!(target: "rag_store::qdrant", url = %cfg.qdrant_url, "connected to Qdrant");
        Ok(Self {
            client,
            distance: cfg.distance,
            upsert_batch: cfg.upsert_batch.max(1),
            exact: cfg.exact_search,
        })
    }

    /// Maps a Qdrant score onto a non-negative distance (lower = closer).
    fn score_to_distance(&self, score: f32) -> f32 {
        match self.distance {
            DistanceKind::Cosine | DistanceKind::Dot => (1.0 - score).max(0.0),
            DistanceKind::Euclid => score.max(0.0),
        }
    }
}

/// Deterministic UUID for a string id so re-adding the same id overwrites.
pub(crate) fn point_uuid(id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes())
}

fn qdrant_err(e: impl std::fmt::Display) -> RagError {
    RagError::Qdrant(e.to_string())
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    fn backend(&self) -> &'static str {
        "qdrant"
    }

    async fn list_collections(&self) -> Result<Vec<String>, RagError> {
        let res = self.client.list_collections().await.map_err(qdrant_err)?;
        let mut names: Vec<String> = res.collections.into_iter().map(|c| c.name).collect();
        names.sort();
        Ok(names)
    }

    async fn ensure_collection(&self, name: &str, dim: usize) -> Result<(), RagError> {
        if self.client.collection_exists(name).await.map_err(qdrant_err)? {
            debug!(target: "rag_store::qdrant", collection = name, "collection already exists");
            return Ok(());
        }
        if dim == 0 {
            return Err(RagError::Config(format!(
                "cannot create collection `{name}` without a vector size"
            )));
        }

        let distance = match self.distance {
            DistanceKind::Cosine => Distance::Cosine,
            DistanceKind::Dot => Distance::Dot,
            DistanceKind::Euclid => Distance::Euclid,
        };
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, distance)),
            )
            .await
            .map_err(qdrant_err)?;

        info!(target: "rag_store::qdrant", collection = name, dim, distance = ?self.distance, "collection created");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, RagError> {
        if !self.client.collection_exists(name).await.map_err(qdrant_err)? {
            return Ok(false);
        }
        let res = self.client.delete_collection(name).await.map_err(qdrant_err)?;
        Ok(res.result)
    }

    async fn add(
        &self,
        name: &str,
        records: &[IndexRecord],
        vectors: &[Vec<f32>],
    ) -> Result<usize, RagError> {
        check_add_input(records, vectors)?;
        if records.is_empty() {
            return Ok(0);
        }
        if let Some(dim) = vectors.first().map(Vec::len) {
            self.ensure_collection(name, dim).await?;
        }

        let points: Vec<PointStruct> = records
            .iter()
            .zip(vectors)
            .map(|(r, v)| build_point(r, v.clone()))
            .collect();

        let mut written = 0usize;
        for batch in points.chunks(self.upsert_batch) {
            self.client
                .upsert_points(UpsertPointsBuilder::new(name, batch.to_vec()).wait(true))
                .await
                .map_err(qdrant_err)?;
            written += batch.len();
        }
        info!(target: "rag_store::qdrant", collection = name, written, "upserted points");
        Ok(written)
    }

    async fn query(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
        filter: Option<&MetaFilter>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        debug!(target: "rag_store::qdrant", collection = name, k, filtered = filter.is_some(), exact = self.exact, "search");

        let mut builder =
            SearchPointsBuilder::new(name, vector.to_vec(), k as u64).with_payload(true);
        if let Some(f) = filter {
            builder = builder.filter(to_qdrant_filter(f));
        }
        if self.exact {
            builder = builder.params(SearchParamsBuilder::default().exact(true));
        }

        let res = self.client.search_points(builder).await.map_err(qdrant_err)?;

        let mut out: Vec<RetrievedChunk> = res
            .result
            .into_iter()
            .map(|p| {
                let fallback_id = p.id.as_ref().map(point_id_to_string).unwrap_or_default();
                payload_to_chunk(p.payload, fallback_id, self.score_to_distance(p.score))
            })
            .collect();
        out.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(out)
    }

    async fn count(&self, name: &str) -> Result<u64, RagError> {
        let res = self
            .client
            .count(CountPointsBuilder::new(name).exact(true))
            .await
            .map_err(qdrant_err)?;
        Ok(res.result.map(|r| r.count).unwrap_or(0))
    }
}

fn build_point(r: &IndexRecord, vector: Vec<f32>) -> PointStruct {
    let mut payload: HashMap<String, QValue> = HashMap::with_capacity(r.metadata.len() + 2);
    for (k, v) in &r.metadata {
        payload.insert(k.clone(), meta_to_qvalue(v));
    }
    payload.insert(ID_FIELD.into(), qstring(&r.id));
    payload.insert(TEXT_FIELD.into(), qstring(&r.text));

    let pid: PointId = point_uuid(&r.id).to_string().into();
    PointStruct {
        id: Some(pid),
        payload,
        vectors: Some(vector.into()),
        ..Default::default()
    }
}

fn qstring(s: &str) -> QValue {
    QValue {
        kind: Some(Kind::StringValue(s.to_string())),
    }
}

fn meta_to_qvalue(v: &MetaValue) -> QValue {
    let kind = match v {
        MetaValue::Str(s) => Kind::StringValue(s.clone()),
        MetaValue::Bool(b) => Kind::BoolValue(*b),
        MetaValue::Num(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
    };
    QValue { kind: Some(kind) }
}

fn point_id_to_string(id: &PointId) -> String {
    use qdrant_client::qdrant::point_id::PointIdOptions;
    match &id.point_id_options {
        Some(PointIdOptions::Uuid(u)) => u.clone(),
        Some(PointIdOptions::Num(n)) => n.to_string(),
        None => String::new(),
    }
}

/// Splits a Qdrant payload into id, text and scalar metadata; nested values are dropped.
fn payload_to_chunk(payload: HashMap<String, QValue>, fallback_id: String, distance: f32) -> RetrievedChunk {
    let mut id = None;
    let mut text = String::new();
    let mut metadata = Metadata::new();

    for (k, v) in payload {
        let value = match v.kind {
            Some(Kind::StringValue(s)) => MetaValue::Str(s),
            Some(Kind::IntegerValue(i)) => MetaValue::from(i),
            Some(Kind::DoubleValue(f)) => match serde_json::Number::from_f64(f) {
                Some(n) => MetaValue::Num(n),
                None => continue,
            },
            Some(Kind::BoolValue(b)) => MetaValue::Bool(b),
            _ => {
                warn!(target: "rag_store::qdrant", key = %k, "non-scalar payload field dropped");
                continue;
            }
        };
        match k.as_str() {
            ID_FIELD => id = value.as_str().map(str::to_string),
            TEXT_FIELD => text = value.to_string(),
            _ => {
                metadata.insert(k, value);
            }
        }
    }

    RetrievedChunk {
        id: id.unwrap_or(fallback_id),
        text,
        metadata,
        distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_ids_are_deterministic_uuids() {
        assert_eq!(point_uuid("chunk-1"), point_uuid("chunk-1"));
        assert_ne!(point_uuid("chunk-1"), point_uuid("chunk-2"));
    }

    #[test]
    fn payload_round_trips_into_chunk_fields() {
        let mut metadata = Metadata::new();
        metadata.insert("state".into(), MetaValue::from("Rajasthan"));
        metadata.insert("year".into(), MetaValue::from(2023));
        let rec = IndexRecord {
            id: "rj-2023-1".into(),
            text: "Stage of extraction 148%".into(),
            metadata,
        };
        let point = build_point(&rec, vec![0.1, 0.2]);
        let chunk = payload_to_chunk(point.payload, "fallback".into(), 0.2);
        assert_eq!(chunk.id, "rj-2023-1");
        assert_eq!(chunk.text, "Stage of extraction 148%");
        assert_eq!(chunk.metadata, rec.metadata);
    }

    // Qdrant's payload matching for the condition shapes `to_qdrant_filter` emits.
    fn filter_accepts(f: &qdrant_client::qdrant::Filter, payload: &HashMap<String, QValue>) -> bool {
        f.must.iter().all(|c| condition_accepts(c, payload))
            && (f.should.is_empty() || f.should.iter().any(|c| condition_accepts(c, payload)))
    }

    fn condition_accepts(c: &qdrant_client::qdrant::Condition, payload: &HashMap<String, QValue>) -> bool {
        use qdrant_client::qdrant::condition::ConditionOneOf;
        use qdrant_client::qdrant::r#match::MatchValue;

        match &c.condition_one_of {
            Some(ConditionOneOf::Filter(f)) => filter_accepts(f, payload),
            Some(ConditionOneOf::Field(fc)) => {
                let Some(kind) = payload.get(&fc.key).and_then(|v| v.kind.as_ref()) else {
                    return false;
                };
                if let Some(r) = &fc.range {
                    let x = match kind {
                        Kind::IntegerValue(i) => *i as f64,
                        Kind::DoubleValue(d) => *d,
                        _ => return false,
                    };
                    return r.gte.is_none_or(|b| x >= b) && r.lte.is_none_or(|b| x <= b);
                }
                match (fc.r#match.as_ref().and_then(|m| m.match_value.as_ref()), kind) {
                    (Some(MatchValue::Keyword(k)), Kind::StringValue(s)) => k == s,
                    (Some(MatchValue::Integer(i)), Kind::IntegerValue(j)) => i == j,
                    (Some(MatchValue::Boolean(a)), Kind::BoolValue(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    #[test]
    fn filters_agree_with_memory_matching_on_stored_points() {
        let stored = [
            MetaValue::from(2023),
            MetaValue::from("2023"),
            MetaValue::Num(serde_json::Number::from_f64(2023.0).unwrap()),
        ];
        let wanted = [MetaValue::from("2023"), MetaValue::from(2023), MetaValue::from("2022")];

        for s in &stored {
            let mut metadata = Metadata::new();
            metadata.insert("year".into(), s.clone());
            metadata.insert("state".into(), MetaValue::from("Rajasthan"));
            let rec = IndexRecord {
                id: "rj".into(),
                text: "t".into(),
                metadata,
            };
            let point = build_point(&rec, vec![0.0]);

            for w in &wanted {
                let f = MetaFilter::all(vec![MetaFilter::eq("state", "Rajasthan"), MetaFilter::eq("year", w.clone())])
                    .unwrap();
                let q = to_qdrant_filter(&f);
                assert!(q.should.is_empty());
                assert_eq!(
                    filter_accepts(&q, &point.payload),
                    f.matches(&rec.metadata),
                    "stored {s:?}, wanted {w:?}"
                );
            }
        }
    }

    #[test]
    fn fractional_equality_still_narrows() {
        let f = MetaFilter::eq("stage_pct", MetaValue::Num(serde_json::Number::from_f64(148.7).unwrap()));
        let q = to_qdrant_filter(&f);
        assert_eq!(q.must.len(), 1);

        let mut hit = HashMap::new();
        hit.insert("stage_pct".to_string(), meta_to_qvalue(&MetaValue::Num(serde_json::Number::from_f64(148.7).unwrap())));
        let mut miss = HashMap::new();
        miss.insert("stage_pct".to_string(), meta_to_qvalue(&MetaValue::Num(serde_json::Number::from_f64(92.1).unwrap())));
        assert!(filter_accepts(&q, &hit));
        assert!(!filter_accepts(&q, &miss));
    }

    #[test]
    fn missing_id_field_falls_back_to_point_id() {
        let chunk = payload_to_chunk(HashMap::new(), "7".into(), 0.0);
        assert_eq!(chunk.id, "7");
        assert!(chunk.text.is_empty());
    }
}
