//! Provider-neutral chat types and the line framing shared by streaming clients.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error_handler::AiLlmError;

/// Ordered stream of generated text fragments.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, AiLlmError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One chat turn. Serialized as `{ "role": "...", "content": "..." }` which both
/// Ollama `/api/chat` and OpenAI `/v1/chat/completions` accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Accumulates raw body chunks and yields complete `\n`-terminated lines.
///
/// Network chunks can split a JSON object or an SSE `data:` line anywhere, so the
/// streaming clients push bytes here and only parse whole lines.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and drains every complete line (without the trailing
    /// `\n`/`\r\n`). Blank lines are skipped.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            if !text.trim().is_empty() {
                out.push(text.to_string());
            }
        }
        out
    }

    /// Returns whatever is left once the body ends (a final line without `\n`).
    pub fn finish(&mut self) -> Option<String> {
        let rest = String::from_utf8_lossy(&self.buf).trim().to_string();
        self.buf.clear();
        (!rest.is_empty()).then_some(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_split_across_chunks_are_reassembled() {
        let mut lb = LineBuffer::new();
        assert!(lb.push(b"{\"message\":{\"con").is_empty());
        let lines = lb.push(b"tent\":\"Hi\"}}\n{\"done\":true}\r\n\n");
        assert_eq!(
            lines,
            vec![
                "{\"message\":{\"content\":\"Hi\"}}".to_string(),
                "{\"done\":true}".to_string()
            ]
        );
        assert_eq!(lb.finish(), None);
    }

    #[test]
    fn trailing_line_without_newline_is_flushed() {
        let mut lb = LineBuffer::new();
        assert!(lb.push(b"data: [DONE]").is_empty());
        assert_eq!(lb.finish().as_deref(), Some("data: [DONE]"));
    }

    #[test]
    fn message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(ChatMessage::user("hello")).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "hello");
    }
}
