//! End-to-end orchestration: classify → retrieve → assemble → generate.

use std::sync::Arc;

use rag_store::{EmbeddingsProvider, IndexHandle, RetrievedChunk};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::api_types::{ChatAnswer, ChatRequest, SourceItem};
use crate::assemble::assemble_context;
use crate::cfg::ContextorConfig;
use crate::classify::Classifier;
use crate::error::ContextorError;
use crate::events::{EventSink, StreamEvent};
use crate::generate::Generator;
use crate::llm::ChatBackend;
use crate::retrieve::Retriever;

/// Shared, request-independent pipeline. Wrap in `Arc` and clone per request.
pub struct RagPipeline {
    cfg: ContextorConfig,
    retriever: Retriever,
    generator: Generator,
}

/// Output of the retrieval half of a request.
struct Gathered {
    chunks: Vec<RetrievedChunk>,
    context: String,
}

impl RagPipeline {
    pub fn new(
        cfg: ContextorConfig,
        index: Arc<IndexHandle>,
        embedder: Arc<dyn EmbeddingsProvider>,
        chat: Arc<dyn ChatBackend>,
    ) -> Result<Self, ContextorError> {
        cfg.validate()?;
        let classifier = Classifier::new(&cfg.classifier)?;
        let retriever = Retriever::new(index, embedder, classifier, cfg.broad.clone());
        let generator = Generator::new(chat, cfg.max_history, cfg.suggestion_count);
        Ok(Self {
            cfg,
            retriever,
            generator,
        })
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    /// Batch answer.
    ///
    /// # Errors
    /// `InvalidInput` for a blank query (before any retrieval) and
    /// `GenerationFailed` when the model call fails. An unreachable index is
    /// not an error: the answer is generated over the no-context sentinel.
    pub async fn answer(&self, req: &ChatRequest) -> Result<ChatAnswer, ContextorError> {
        validate(req)?;
        let g = self.gather(req).await;
        let answer = self
            .generator
            .generate(&req.query, &g.context, &req.history)
            .await?;
        let suggestions = self.generator.suggest(&req.query, &g.context, &g.chunks).await;
        info!(target: "contextor::pipeline", sources = g.chunks.len(), "answer ready");
        Ok(ChatAnswer {
            answer,
            sources: g.chunks.iter().map(SourceItem::from).collect(),
            suggestions,
        })
    }

    /// Starts a streamed answer and returns the event receiver.
    ///
    /// Validation happens here so a bad request fails before any event is
    /// produced. Dropping the receiver cancels the producer task.
    pub fn answer_stream(
        self: &Arc<Self>,
        req: ChatRequest,
    ) -> Result<mpsc::Receiver<StreamEvent>, ContextorError> {
        validate(&req)?;
        let (sink, rx) = EventSink::channel();
        let this = Arc::clone(self);
        let span = info_span!("answer_stream");
        tokio::spawn(async move { this.produce(req, sink).await }.instrument(span));
        Ok(rx)
    }

    async fn produce(&self, req: ChatRequest, mut sink: EventSink) {
        match self.stream_into(&req, &mut sink).await {
            Ok(()) => {}
            Err(ContextorError::ClientGone) => {
                debug!(target: "contextor::pipeline", "client disconnected; producer stopped");
            }
            Err(e) => {
                warn!(target: "contextor::pipeline", error = %e, "stream failed");
                if !sink.is_finished() {
                    let _ = sink.error(e.to_string()).await;
                }
            }
        }
    }

    async fn stream_into(&self, req: &ChatRequest, sink: &mut EventSink) -> Result<(), ContextorError> {
        let g = self.gather(req).await;
        sink.sources(g.chunks.iter().map(SourceItem::from).collect()).await?;
        self.generator
            .generate_streaming(&req.query, &g.context, &req.history, sink)
            .await?;
        let suggestions = self.generator.suggest(&req.query, &g.context, &g.chunks).await;
        sink.suggestions(suggestions).await?;
        sink.done().await
    }

    /// Retrieval with graceful degradation to the sentinel context.
    async fn gather(&self, req: &ChatRequest) -> Gathered {
        let top_k = self.cfg.top_k(req.top_k);
        let chunks = match self.retriever.retrieve(&req.query, top_k, &req.filters).await {
            Ok(r) => r.chunks,
            Err(e) => {
                if matches!(e, ContextorError::RetrievalUnavailable(_)) {
                    warn!(target: "contextor::pipeline", error = %e, "retrieval unavailable; answering without context");
                } else {
                    error!(target: "contextor::pipeline", error = %e, "retrieval failed; answering without context");
                }
                Vec::new()
            }
        };
        let context = assemble_context(&chunks);
        Gathered { chunks, context }
    }
}

fn validate(req: &ChatRequest) -> Result<(), ContextorError> {
    if req.query.trim().is_empty() {
        return Err(ContextorError::InvalidInput("query must not be empty".into()));
    }
    Ok(())
}
