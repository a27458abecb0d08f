//! Router behaviour over in-process fakes.

use std::sync::Arc;

use ai_llm_service::error_handler::{Provider, ProviderError, ProviderErrorKind};
use ai_llm_service::{AiLlmError, ChatMessage, TokenStream};
use api::{ApiConfig, AppState, build_router};
use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use contextor::{ChatBackend, ContextorConfig};
use http_body_util::BodyExt;
use rag_store::{
    EmbedFuture, EmbeddingsProvider, IndexHandle, IndexRecord, IngestDoc, MemoryIndex, MetaFilter,
    RagConfig, RagError, RetrievedChunk, VectorIndex, ingest,
};
use serde_json::{Value, json};
use tower::ServiceExt;

const COLLECTION: &str = "groundwater";

/* ------------------------------ fakes ------------------------------ */

struct FixedEmbedder;

impl EmbeddingsProvider for FixedEmbedder {
    fn embed<'a>(&'a self, _text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
        Box::pin(async { Ok(vec![1.0, 0.0]) })
    }
}

struct ScriptedChat {
    tokens: Vec<&'static str>,
    fail: bool,
}

fn provider_down() -> AiLlmError {
    AiLlmError::Provider(ProviderError::new(
        Provider::Ollama,
        ProviderErrorKind::Stream("connection reset".into()),
    ))
}

#[async_trait]
impl ChatBackend for ScriptedChat {
    async fn complete(&self, _m: &[ChatMessage]) -> Result<String, AiLlmError> {
        if self.fail {
            return Err(provider_down());
        }
        Ok(self.tokens.concat())
    }

    async fn stream(&self, _m: &[ChatMessage]) -> Result<TokenStream, AiLlmError> {
        let items: Vec<Result<String, AiLlmError>> =
            self.tokens.iter().map(|t| Ok(t.to_string())).collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn complete_fast(&self, _m: &[ChatMessage]) -> Result<String, AiLlmError> {
        Ok("1. Is Jaipur over-exploited?\n2. How much is recharged yearly?".into())
    }
}

/// Every call fails the way an unreachable Qdrant does.
struct DownIndex;

fn refused() -> RagError {
    RagError::Unavailable("connection refused".into())
}

#[async_trait]
impl VectorIndex for DownIndex {
    fn backend(&self) -> &'static str {
        "down"
    }
    async fn list_collections(&self) -> Result<Vec<String>, RagError> {
        Err(refused())
    }
    async fn ensure_collection(&self, _: &str, _: usize) -> Result<(), RagError> {
        Err(refused())
    }
    async fn delete_collection(&self, _: &str) -> Result<bool, RagError> {
        Err(refused())
    }
    async fn add(&self, _: &str, _: &[IndexRecord], _: &[Vec<f32>]) -> Result<usize, RagError> {
        Err(refused())
    }
    async fn query(
        &self,
        _: &str,
        _: &[f32],
        _: usize,
        _: Option<&MetaFilter>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        Err(refused())
    }
    async fn count(&self, _: &str) -> Result<u64, RagError> {
        Err(refused())
    }
}

async fn seeded_index() -> Arc<IndexHandle> {
    let index = Arc::new(MemoryIndex::new());
    let docs = vec![IngestDoc {
        id: Some("raj-1".into()),
        text: "Rajasthan stage of extraction is 148%.".into(),
        metadata: json!({"state": "Rajasthan", "year": "2022-2023", "source_type": "state_report"}),
    }];
    ingest(index.as_ref(), &FixedEmbedder, COLLECTION, docs)
        .await
        .unwrap();
    Arc::new(IndexHandle::from_index(RagConfig::memory(COLLECTION), index))
}

async fn app_with(chat: ScriptedChat) -> Router {
    app_over(seeded_index().await, chat)
}

fn app_over(index: Arc<IndexHandle>, chat: ScriptedChat) -> Router {
    let state = AppState::new(
        ApiConfig::default(),
        ContextorConfig::default(),
        index,
        Arc::new(FixedEmbedder),
        Arc::new(chat),
    )
    .unwrap();
    build_router(Arc::new(state))
}

async fn app() -> Router {
    app_with(ScriptedChat {
        tokens: vec!["Extraction ", "is high [1]."],
        fail: false,
    })
    .await
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn as_json(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

/// `(event name, data)` pairs of an SSE body.
fn sse_events(body: &str) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    let mut name = None;
    for line in body.lines() {
        if let Some(n) = line.strip_prefix("event:") {
            name = Some(n.trim().to_string());
        } else if let Some(d) = line.strip_prefix("data:") {
            let data: Value = serde_json::from_str(d.trim()).unwrap();
            out.push((name.take().unwrap_or_default(), data));
        }
    }
    out
}

/* ------------------------------ chat ------------------------------ */

#[tokio::test]
async fn chat_returns_answer_sources_and_suggestions() {
    let (status, _, body) = send(
        app().await,
        post_json(
            "/api/chat",
            json!({"query": "What is the extraction in Jaipur district?", "filters": {"state": "Rajasthan"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let v = as_json(&body);
    assert_eq!(v["answer"], "Extraction is high [1].");
    assert_eq!(v["sources"][0]["id"], "raj-1");
    let relevance = v["sources"][0]["relevance"].as_f64().unwrap();
    assert!((relevance - 1.0).abs() < 1e-6);
    assert_eq!(v["suggestions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn blank_query_is_bad_request() {
    let (status, headers, body) = send(app().await, post_json("/api/chat", json!({"query": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body)["error"], "INVALID_INPUT");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn generation_failure_is_bad_gateway() {
    let app = app_with(ScriptedChat {
        tokens: vec![],
        fail: true,
    })
    .await;
    let (status, _, body) = send(app, post_json("/api/chat", json!({"query": "Is Goa safe?"}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let v = as_json(&body);
    assert_eq!(v["error"], "GENERATION_FAILED");
    assert!(v["message"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn chat_stream_orders_events() {
    let (status, headers, body) = send(
        app().await,
        post_json("/api/chat/stream", json!({"query": "Tell me about Rajasthan"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );

    let events = sse_events(&body);
    let names: Vec<&str> = events.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["sources", "token", "token", "suggestions", "done"]);

    let streamed: String = events
        .iter()
        .filter(|(n, _)| n == "token")
        .map(|(_, d)| d["content"].as_str().unwrap())
        .collect();
    assert_eq!(streamed, "Extraction is high [1].");
    assert_eq!(events[0].1["type"], "sources");
}

#[tokio::test]
async fn malformed_body_gets_envelope() {
    let req = Request::post("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-request-id", "abc-123")
        .body(Body::from("{\"query\": "))
        .unwrap();
    let (status, headers, body) = send(app().await, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers["x-request-id"], "abc-123");
    let v = as_json(&body);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"]["code"], "BAD_REQUEST");
}

/* ------------------------------ tools ------------------------------ */

fn search_result() -> Value {
    json!({
        "found": true,
        "location": {
            "name": "Jaipur",
            "state": "Rajasthan",
            "category": "Over-Exploited",
            "metrics": {"stage_of_extraction_pct": 221.5, "annual_recharge_ham": null}
        }
    })
}

#[tokio::test]
async fn tool_query_renders_missing_numbers_as_marker() {
    let (status, _, body) = send(
        app().await,
        post_json(
            "/api/tools/query",
            json!({"tool": "search_location", "arguments": {"name": "Jaipur"}, "result": search_result()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let v = as_json(&body);
    assert_eq!(v["tool"], "search_location");
    assert!(!v["visualizations"].as_array().unwrap().is_empty());
    assert!(body.contains("\"N/A\""));
    assert!(body.contains("221.5"));
    assert!(!v["suggestions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn empty_ranking_renders_a_message() {
    let (status, _, body) = send(
        app().await,
        post_json(
            "/api/tools/query",
            json!({"tool": "get_top_locations", "result": {"found": false, "message": "No rankings for 2031"}}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let v = as_json(&body);
    assert_eq!(v["visualizations"][0]["type"], "stats");
    assert_eq!(v["visualizations"][0]["message"], "No rankings for 2031");
    assert!(v.get("summary").is_none());
}

#[tokio::test]
async fn unknown_tool_and_missing_backend_are_rejected() {
    let (status, _, body) = send(
        app().await,
        post_json("/api/tools/query", json!({"tool": "drop_tables"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body)["error"], "UNKNOWN_TOOL");

    let (status, _, body) = send(
        app().await,
        post_json("/api/tools/query", json!({"tool": "list_locations"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(as_json(&body)["error"], "INVALID_INPUT");
}

#[tokio::test]
async fn tool_stream_orders_events() {
    let (status, _, body) = send(
        app().await,
        post_json(
            "/api/tools/stream",
            json!({"tool": "search_location", "arguments": {"name": "Jaipur"}, "result": search_result()}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = sse_events(&body);
    let names: Vec<&str> = events.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["tool_call", "tool_result", "data", "suggestions", "done"]);
    assert_eq!(events[0].1["arguments"]["name"], "Jaipur");
    assert!(events[2].1["data"]["visualizations"].is_array());
}

#[tokio::test]
async fn malformed_tool_result_ends_stream_with_error() {
    let (_, _, body) = send(
        app().await,
        post_json(
            "/api/tools/stream",
            json!({"tool": "get_top_locations", "result": {"found": true, "items": []}}),
        ),
    )
    .await;
    let names: Vec<String> = sse_events(&body).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["tool_call", "error"]);
}

/* --------------------------- management --------------------------- */

#[tokio::test]
async fn collection_lifecycle() {
    let app = app().await;

    let (status, _, body) = send(app.clone(), Request::post("/api/collections/wells").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(as_json(&body)["data"]["count"], 0);

    let (status, _, body) = send(
        app.clone(),
        post_json(
            "/api/collections/wells/add",
            json!({"documents": ["Dug well levels fell 2 m."], "metadatas": [{"site": {"kind": "dug"}}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(as_json(&body)["data"]["count"], 1);

    let (status, _, body) = send(
        app.clone(),
        post_json("/api/collections/wells/query", json!({"text": "well levels"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let v = as_json(&body);
    assert_eq!(v["results"][0]["document"], "Dug well levels fell 2 m.");
    assert_eq!(v["results"][0]["metadata"]["site_kind"], "dug");

    let (status, _, body) = send(app.clone(), Request::get("/api/collections").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let names = as_json(&body)["data"]["collections"].clone();
    assert_eq!(names, json!([COLLECTION, "wells"]));

    let delete = || Request::delete("/api/collections/wells").body(Body::empty()).unwrap();
    let (status, _, _) = send(app.clone(), delete()).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, body) = send(app, delete()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(as_json(&body)["error"], "NOT_FOUND");
}

#[tokio::test]
async fn query_unknown_collection_is_not_found() {
    let (status, _, _) = send(
        app().await,
        post_json("/api/collections/missing/query", json!({"query": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn embed_accepts_single_input() {
    let (status, _, body) = send(app().await, post_json("/api/embed", json!({"input": "recharge"}))).await;
    assert_eq!(status, StatusCode::OK);
    let v = as_json(&body);
    assert_eq!(v["count"], 1);
    assert_eq!(v["dimension"], 2);

    let (status, _, _) = send(app().await, post_json("/api/embed", json!({"texts": []}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

/* ---------------------------- generate ---------------------------- */

#[tokio::test]
async fn generate_batch_and_stream() {
    let (status, _, body) = send(app().await, post_json("/api/generate", json!({"prompt": "Say hi"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["response"], "Extraction is high [1].");

    let (status, _, body) = send(
        app().await,
        post_json("/api/generate", json!({"prompt": "Say hi", "stream": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<String> = sse_events(&body).into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, ["token", "token", "done"]);

    let (status, _, _) = send(app().await, post_json("/api/generate/stream", json!({"prompt": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_index_and_unconfigured_llm() {
    let (status, _, body) = send(app().await, Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let v = as_json(&body);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["ollama"], "unconfigured");
    assert_eq!(v["vector_index"], "available");
    assert_eq!(v["vector_backend"], "memory");
}

fn down_app() -> Router {
    let index = Arc::new(IndexHandle::from_index(RagConfig::memory(COLLECTION), Arc::new(DownIndex)));
    app_over(
        index,
        ScriptedChat {
            tokens: vec!["No indexed data ", "is available."],
            fail: false,
        },
    )
}

#[tokio::test]
async fn chat_answers_without_sources_when_index_is_down() {
    let (status, _, body) = send(
        down_app(),
        post_json("/api/chat", json!({"query": "What is the groundwater status of Goa?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let v = as_json(&body);
    assert_eq!(v["sources"], json!([]));
    assert_eq!(v["answer"], "No indexed data is available.");
}

#[tokio::test]
async fn chat_stream_starts_with_empty_sources_when_index_is_down() {
    let (status, _, body) = send(
        down_app(),
        post_json("/api/chat/stream", json!({"query": "What is the groundwater status of Goa?"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let events = sse_events(&body);
    assert_eq!(events[0].0, "sources");
    assert_eq!(events[0].1["sources"], json!([]));
    assert_eq!(events.last().map(|e| e.0.as_str()), Some("done"));
}

#[tokio::test]
async fn health_reports_unavailable_index() {
    let (status, _, body) = send(down_app(), Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body)["vector_index"], "unavailable");
}
