use rag_store::Metadata;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CollectionsList {
    pub collections: Vec<String>,
    pub backend: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CollectionStatus {
    /// `created`, `added` or `deleted`.
    pub status: &'static str,
    pub collection: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct QueryHit {
    pub id: String,
    pub document: String,
    pub metadata: Metadata,
    pub distance: f32,
}

#[derive(Debug, Serialize)]
pub struct QueryCollectionResponse {
    pub results: Vec<QueryHit>,
}
