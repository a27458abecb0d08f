//! Response generation: batch answer, streamed answer, follow-up suggestions.

use std::sync::Arc;

use ai_llm_service::ChatMessage;
use futures::StreamExt;
use rag_store::RetrievedChunk;
use tracing::{debug, instrument, warn};

use crate::api_types::HistoryMessage;
use crate::error::ContextorError;
use crate::events::EventSink;
use crate::llm::ChatBackend;
use crate::prompt::{build_messages, build_suggestion_messages, parse_suggestions};

pub struct Generator {
    chat: Arc<dyn ChatBackend>,
    max_history: usize,
    suggestion_count: usize,
}

impl Generator {
    pub fn new(chat: Arc<dyn ChatBackend>, max_history: usize, suggestion_count: usize) -> Self {
        Self {
            chat,
            max_history,
            suggestion_count,
        }
    }

    pub fn chat(&self) -> &Arc<dyn ChatBackend> {
        &self.chat
    }

    /// Full answer in one call.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn generate(
        &self,
        query: &str,
        context: &str,
        history: &[HistoryMessage],
    ) -> Result<String, ContextorError> {
        let messages = build_messages(query, context, history, self.max_history);
        self.chat
            .complete(&messages)
            .await
            .map_err(ContextorError::GenerationFailed)
    }

    /// Streams tokens into `sink` and returns the concatenated answer.
    ///
    /// Returns [`ContextorError::ClientGone`] as soon as the receiver is
    /// dropped; the upstream stream is dropped with it. Tokens already written
    /// stay written when the provider fails mid-stream.
    #[instrument(skip_all, fields(history = history.len()))]
    pub async fn generate_streaming(
        &self,
        query: &str,
        context: &str,
        history: &[HistoryMessage],
        sink: &mut EventSink,
    ) -> Result<String, ContextorError> {
        let messages = build_messages(query, context, history, self.max_history);
        self.pump(&messages, sink).await
    }

    /// Sends `prompt` as a single user turn, without retrieval context.
    pub async fn generate_raw(&self, prompt: &str) -> Result<String, ContextorError> {
        self.chat
            .complete(&[ChatMessage::user(prompt)])
            .await
            .map_err(ContextorError::GenerationFailed)
    }

    /// Streaming variant of [`generate_raw`](Self::generate_raw).
    pub async fn generate_raw_streaming(
        &self,
        prompt: &str,
        sink: &mut EventSink,
    ) -> Result<String, ContextorError> {
        self.pump(&[ChatMessage::user(prompt)], sink).await
    }

    async fn pump(&self, messages: &[ChatMessage], sink: &mut EventSink) -> Result<String, ContextorError> {
        let mut stream = self
            .chat
            .stream(messages)
            .await
            .map_err(ContextorError::GenerationFailed)?;

        let mut full = String::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = sink.closed() => return Err(ContextorError::ClientGone),
                item = stream.next() => item,
            };
            match next {
                Some(Ok(token)) => {
                    if token.is_empty() {
                        continue;
                    }
                    full.push_str(&token);
                    sink.token(token).await?;
                }
                Some(Err(e)) => return Err(ContextorError::GenerationFailed(e)),
                None => break,
            }
        }
        debug!(target: "contextor::generate", chars = full.len(), "stream complete");
        Ok(full)
    }

    /// Up to `suggestion_count` follow-up questions; never fails.
    ///
    /// Asks the fast model first and falls back to metadata-derived templates
    /// when it errors or returns nothing usable.
    pub async fn suggest(&self, query: &str, context: &str, chunks: &[RetrievedChunk]) -> Vec<String> {
        if self.suggestion_count == 0 {
            return Vec::new();
        }
        let messages = build_suggestion_messages(query, context, self.suggestion_count);
        match self.chat.complete_fast(&messages).await {
            Ok(reply) => {
                let parsed = parse_suggestions(&reply, self.suggestion_count);
                if !parsed.is_empty() {
                    return parsed;
                }
                debug!(target: "contextor::generate", "model returned no usable suggestions");
            }
            Err(e) => warn!(target: "contextor::generate", error = %e, "suggestion call failed"),
        }
        fallback_suggestions(chunks, self.suggestion_count)
    }
}

/// Deterministic follow-ups built from the metadata of the top chunks.
pub fn fallback_suggestions(chunks: &[RetrievedChunk], count: usize) -> Vec<String> {
    let state = chunks.iter().find_map(|c| c.meta_str("state"));
    let district = chunks.iter().find_map(|c| c.meta_str("district"));
    let year = chunks.iter().find_map(|c| c.meta_str("year"));

    let mut out = Vec::new();
    if let Some(state) = state {
        out.push(format!("What is the stage of groundwater extraction in {state}?"));
        if let Some(district) = district {
            out.push(format!("How does {district} compare with other districts in {state}?"));
        }
        out.push(match year {
            Some(year) => format!("How has groundwater recharge in {state} changed since {year}?"),
            None => format!("How has groundwater recharge in {state} changed over recent years?"),
        });
        out.push(format!("Which areas of {state} are over-exploited?"));
    }
    out.extend(
        [
            "Which states have the highest groundwater extraction?",
            "What is the national groundwater recharge trend?",
            "Which regions are categorized as critical?",
        ]
        .into_iter()
        .map(String::from),
    );
    out.truncate(count);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::{AiLlmError, ChatMessage, TokenStream};
    use async_trait::async_trait;
    use rag_store::{MetaValue, Metadata};
    use std::time::Duration;

    struct Scripted {
        tokens: Vec<&'static str>,
        suggest: Option<&'static str>,
    }

    #[async_trait]
    impl ChatBackend for Scripted {
        async fn complete(&self, _m: &[ChatMessage]) -> Result<String, AiLlmError> {
            Ok(self.tokens.concat())
        }

        async fn stream(&self, _m: &[ChatMessage]) -> Result<TokenStream, AiLlmError> {
            let items: Vec<Result<String, AiLlmError>> =
                self.tokens.iter().map(|t| Ok(t.to_string())).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }

        async fn complete_fast(&self, _m: &[ChatMessage]) -> Result<String, AiLlmError> {
            self.suggest
                .map(str::to_string)
                .ok_or(AiLlmError::Timeout(Duration::from_secs(1)))
        }
    }

    fn generator(suggest: Option<&'static str>) -> Generator {
        Generator::new(
            Arc::new(Scripted {
                tokens: vec!["Ground", "water ", "is fine."],
                suggest,
            }),
            6,
            3,
        )
    }

    #[tokio::test]
    async fn streamed_tokens_concatenate_to_batch_answer() {
        let g = generator(None);
        let batch = g.generate("q", "ctx", &[]).await.unwrap();

        let (mut sink, mut rx) = EventSink::channel();
        sink.sources(vec![]).await.unwrap();
        let streamed = g.generate_streaming("q", "ctx", &[], &mut sink).await.unwrap();
        drop(sink);

        let mut joined = String::new();
        while let Some(ev) = rx.recv().await {
            if let crate::events::StreamEvent::Token { content } = ev {
                joined.push_str(&content);
            }
        }
        assert_eq!(batch, streamed);
        assert_eq!(joined, batch);
    }

    #[tokio::test]
    async fn closed_receiver_stops_generation() {
        let g = generator(None);
        let (mut sink, rx) = EventSink::channel();
        sink.sources(vec![]).await.unwrap();
        drop(rx);
        let res = g.generate_streaming("q", "ctx", &[], &mut sink).await;
        assert!(matches!(res, Err(ContextorError::ClientGone)));
    }

    #[tokio::test]
    async fn raw_stream_skips_sources() {
        let g = generator(None);
        let (mut sink, mut rx) = EventSink::channel();
        sink.begin_plain().unwrap();
        let text = g.generate_raw_streaming("hello", &mut sink).await.unwrap();
        sink.done().await.unwrap();
        drop(sink);

        let mut names = Vec::new();
        while let Some(ev) = rx.recv().await {
            names.push(ev.name());
        }
        assert_eq!(names, ["token", "token", "token", "done"]);
        assert_eq!(text, g.generate_raw("hello").await.unwrap());
    }

    #[tokio::test]
    async fn suggestion_failure_falls_back_to_metadata() {
        let g = generator(None);
        let mut md = Metadata::new();
        md.insert("state".into(), MetaValue::from("Rajasthan"));
        let chunk = RetrievedChunk {
            id: "c".into(),
            text: "t".into(),
            metadata: md,
            distance: 0.1,
        };
        let got = g.suggest("q", "ctx", &[chunk]).await;
        assert_eq!(got.len(), 3);
        assert!(got[0].contains("Rajasthan"));
    }

    #[tokio::test]
    async fn model_suggestions_are_used_when_valid() {
        let g = generator(Some("1. Is Goa safe?\n2. What about Kerala?"));
        let got = g.suggest("q", "ctx", &[]).await;
        assert_eq!(got, vec!["Is Goa safe?", "What about Kerala?"]);
    }

    #[test]
    fn fallback_without_metadata_is_generic() {
        let got = fallback_suggestions(&[], 2);
        assert_eq!(got.len(), 2);
        assert!(got[0].starts_with("Which states"));
    }
}
