//! Thin client for the local Ollama API.
//!
//! - `POST {endpoint}/api/chat`: chat completion, batch (`stream=false`) or NDJSON stream
//! - `POST {endpoint}/api/embed`: batch embeddings (`input: [..]` → `embeddings: [[..]]`)
//!
//! # Examples
//!
//! ```no_run
//! use ai_llm_service::{ChatMessage, LlmModelConfig};
//! use ai_llm_service::services::ollama_service::OllamaService;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = OllamaService::new(LlmModelConfig::ollama("http://localhost:11434", "gemma3:12b"))?;
//! let text = svc.chat(&[ChatMessage::user("What is a safe block?")]).await?;
//! println!("{text}");
//! # Ok(()) }
//! ```

use std::time::{Duration, Instant};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::{
    chat::{ChatMessage, LineBuffer, TokenStream},
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, Result,
        is_http_endpoint, make_snippet,
    },
};

fn ollama_err(kind: ProviderErrorKind) -> AiLlmError {
    ProviderError::new(Provider::Ollama, kind).into()
}

/// Reuses one HTTP client per model config.
#[derive(Debug)]
pub struct OllamaService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embed: String,
}

impl OllamaService {
    /// Creates a new [`OllamaService`] from the given config.
    ///
    /// # Errors
    /// - `InvalidProvider` if `cfg.provider` is not `Ollama`
    /// - `InvalidEndpoint` if `cfg.endpoint` is not http/https
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self> {
        if cfg.provider != LlmProvider::Ollama {
            return Err(ollama_err(ProviderErrorKind::InvalidProvider));
        }
        if !is_http_endpoint(&cfg.endpoint) {
            return Err(ollama_err(ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone())));
        }

        let timeout = Duration::from_secs(cfg.timeout_secs.unwrap_or(60));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .brotli(true)
            .build()?;

        let base = cfg.endpoint.trim().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            url_chat: format!("{base}/api/chat"),
            url_embed: format!("{base}/api/embed"),
            cfg,
        })
    }

    pub fn config(&self) -> &LlmModelConfig {
        &self.cfg
    }

    /// Non-streaming chat via `/api/chat`.
    #[instrument(skip_all, fields(model = %self.cfg.model, messages = messages.len()))]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let started = Instant::now();
        let body = ChatRequest::from_cfg(&self.cfg, messages, false);

        debug!("POST {}", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;
        let resp = check_status(resp, &self.url_chat).await?;

        let out: ChatChunk = resp.json().await.map_err(|e| {
            ollama_err(ProviderErrorKind::Decode(format!(
                "serde error: {e}; expected `message.content`"
            )))
        })?;

        debug!(latency_ms = started.elapsed().as_millis() as u64, "ollama chat completed");
        Ok(out.message.map(|m| m.content).unwrap_or_default())
    }

    /// Streaming chat via `/api/chat` with `stream=true`.
    ///
    /// The response body is newline-delimited JSON; each object carries a
    /// `message.content` fragment and the last one has `done: true`. Dropping the
    /// returned stream drops the body and aborts the request.
    #[instrument(skip_all, fields(model = %self.cfg.model, messages = messages.len()))]
    pub async fn chat_stream(&self, messages: &[ChatMessage]) -> Result<TokenStream> {
        let body = ChatRequest::from_cfg(&self.cfg, messages, true);

        debug!("POST {} (stream)", self.url_chat);
        let resp = self.client.post(&self.url_chat).json(&body).send().await?;
        let resp = check_status(resp, &self.url_chat).await?;
        let mut bytes = resp.bytes_stream();

        let stream = async_stream::try_stream! {
            let mut lines = LineBuffer::new();
            let mut finished = false;
            while let Some(chunk) = bytes.next().await {
                let chunk = chunk.map_err(AiLlmError::from)?;
                for line in lines.push(&chunk) {
                    let parsed = parse_chat_line(&line)?;
                    if let Some(token) = parsed.token {
                        yield token;
                    }
                    finished |= parsed.done;
                }
                if finished {
                    break;
                }
            }
            if !finished {
                if let Some(line) = lines.finish() {
                    if let Some(token) = parse_chat_line(&line)?.token {
                        yield token;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    /// Embeds a batch of texts via `/api/embed`; output order follows input order.
    #[instrument(skip_all, fields(model = %self.cfg.model, batch = texts.len()))]
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbedRequest {
            model: &self.cfg.model,
            input: texts,
        };

        debug!("POST {}", self.url_embed);
        let resp = self.client.post(&self.url_embed).json(&body).send().await?;
        let resp = check_status(resp, &self.url_embed).await?;

        let out: EmbedResponse = resp.json().await.map_err(|e| {
            ollama_err(ProviderErrorKind::Decode(format!(
                "serde error: {e}; expected `{{ embeddings: number[][] }}`"
            )))
        })?;

        if out.embeddings.len() != texts.len() {
            return Err(ollama_err(ProviderErrorKind::EmbeddingCount {
                expected: texts.len(),
                got: out.embeddings.len(),
            }));
        }
        Ok(out.embeddings)
    }
}

async fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let snippet = make_snippet(&text);
    error!(%status, %url, %snippet, "ollama returned non-success status");
    Err(ollama_err(ProviderErrorKind::HttpStatus(HttpError {
        status,
        url: url.to_string(),
        snippet,
    })))
}

#[derive(Debug, Default, PartialEq)]
struct ParsedLine {
    token: Option<String>,
    done: bool,
}

fn parse_chat_line(line: &str) -> Result<ParsedLine> {
    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| ollama_err(ProviderErrorKind::Decode(format!("bad stream line: {e}"))))?;
    if let Some(err) = chunk.error {
        return Err(ollama_err(ProviderErrorKind::Stream(err)));
    }
    let token = chunk
        .message
        .map(|m| m.content)
        .filter(|c| !c.is_empty());
    Ok(ParsedLine {
        token,
        done: chunk.done,
    })
}

/* ==========================
HTTP payloads & options
========================== */

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

impl<'a> ChatRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, messages: &'a [ChatMessage], stream: bool) -> Self {
        Self {
            model: &cfg.model,
            messages,
            stream,
            options: Some(ChatOptions {
                temperature: cfg.temperature,
                top_p: cfg.top_p,
                num_predict: cfg.max_tokens,
            }),
        }
    }
}

/// Subset of Ollama `options`.
#[derive(Debug, Default, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// One `/api/chat` response object (whole body in batch mode, one line in stream mode).
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_and_done_lines() {
        let p = parse_chat_line(r#"{"message":{"role":"assistant","content":"Gro"},"done":false}"#)
            .unwrap();
        assert_eq!(p.token.as_deref(), Some("Gro"));
        assert!(!p.done);

        let p = parse_chat_line(r#"{"message":{"role":"assistant","content":""},"done":true}"#)
            .unwrap();
        assert_eq!(p, ParsedLine { token: None, done: true });
    }

    #[test]
    fn error_line_fails_the_stream() {
        assert!(parse_chat_line(r#"{"error":"model not found"}"#).is_err());
        assert!(parse_chat_line("not json").is_err());
    }

    #[test]
    fn rejects_non_ollama_config() {
        let mut cfg = LlmModelConfig::ollama("http://localhost:11434", "m");
        cfg.provider = LlmProvider::OpenAI;
        assert!(OllamaService::new(cfg).is_err());
        assert!(OllamaService::new(LlmModelConfig::ollama("localhost:11434", "m")).is_err());
    }
}
