//! Server-push event protocol and the sink that enforces its ordering.
//!
//! Order for a chat stream: `sources` → `token`* → `suggestions`? → `done`,
//! with `error` allowed as the terminal at any point. Tool streams use
//! `tool_call` → `tool_result` → `data` → `suggestions`? → `done`.
//! Exactly one terminal event is ever written.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api_types::SourceItem;
use crate::error::ContextorError;

/// Channel capacity used by pipeline producers.
pub const EVENT_BUFFER: usize = 64;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Sources { sources: Vec<SourceItem> },
    Token { content: String },
    Data { data: Value },
    ToolCall { tool: String, arguments: Value },
    ToolResult { tool: String, result: Value },
    Suggestions { suggestions: Vec<String> },
    Error { message: String },
    Done,
}

impl StreamEvent {
    /// SSE `event:` name.
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::Token { .. } => "token",
            StreamEvent::Data { .. } => "data",
            StreamEvent::ToolCall { .. } => "tool_call",
            StreamEvent::ToolResult { .. } => "tool_result",
            StreamEvent::Suggestions { .. } => "suggestions",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Open,
    Answering,
    Finishing,
    Closed,
}

/// Ordered, cancellable writer over an mpsc channel.
///
/// Every write fails with [`ContextorError::ClientGone`] once the receiver is
/// dropped; producers stop on that error.
#[derive(Debug)]
pub struct EventSink {
    tx: mpsc::Sender<StreamEvent>,
    phase: Phase,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<StreamEvent>) -> Self {
        Self {
            tx,
            phase: Phase::Open,
        }
    }

    /// Sink plus its receiver, sized [`EVENT_BUFFER`].
    pub fn channel() -> (Self, mpsc::Receiver<StreamEvent>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        (Self::new(tx), rx)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves when the receiver is dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub async fn sources(&mut self, sources: Vec<SourceItem>) -> Result<(), ContextorError> {
        self.expect(Phase::Open, "sources must be the first event")?;
        self.send(StreamEvent::Sources { sources }).await?;
        self.phase = Phase::Answering;
        Ok(())
    }

    /// Enters the answer phase without a `sources` event (raw generation).
    pub fn begin_plain(&mut self) -> Result<(), ContextorError> {
        self.expect(Phase::Open, "stream already started")?;
        self.phase = Phase::Answering;
        Ok(())
    }

    pub async fn token(&mut self, content: String) -> Result<(), ContextorError> {
        self.expect(Phase::Answering, "token outside the answer phase")?;
        self.send(StreamEvent::Token { content }).await
    }

    pub async fn tool_call(&mut self, tool: &str, arguments: Value) -> Result<(), ContextorError> {
        self.expect(Phase::Open, "tool_call must be the first event")?;
        self.send(StreamEvent::ToolCall {
            tool: tool.to_string(),
            arguments,
        })
        .await?;
        self.phase = Phase::Answering;
        Ok(())
    }

    pub async fn tool_result(&mut self, tool: &str, result: Value) -> Result<(), ContextorError> {
        self.expect(Phase::Answering, "tool_result before tool_call")?;
        self.send(StreamEvent::ToolResult {
            tool: tool.to_string(),
            result,
        })
        .await
    }

    pub async fn data(&mut self, data: Value) -> Result<(), ContextorError> {
        self.expect(Phase::Answering, "data outside the answer phase")?;
        self.send(StreamEvent::Data { data }).await
    }

    /// Marks the answer final; no tokens may follow.
    pub async fn suggestions(&mut self, suggestions: Vec<String>) -> Result<(), ContextorError> {
        self.expect(Phase::Answering, "suggestions before the answer")?;
        self.phase = Phase::Finishing;
        self.send(StreamEvent::Suggestions { suggestions }).await
    }

    pub async fn done(&mut self) -> Result<(), ContextorError> {
        if matches!(self.phase, Phase::Open | Phase::Closed) {
            return Err(ContextorError::StreamState("done without an answer"));
        }
        self.phase = Phase::Closed;
        self.send(StreamEvent::Done).await
    }

    /// Terminal failure; allowed from any phase except after a terminal.
    pub async fn error(&mut self, message: impl Into<String>) -> Result<(), ContextorError> {
        if self.phase == Phase::Closed {
            return Err(ContextorError::StreamState("error after terminal event"));
        }
        self.phase = Phase::Closed;
        self.send(StreamEvent::Error {
            message: message.into(),
        })
        .await
    }

    fn expect(&self, phase: Phase, msg: &'static str) -> Result<(), ContextorError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(ContextorError::StreamState(msg))
        }
    }

    async fn send(&self, ev: StreamEvent) -> Result<(), ContextorError> {
        let name = ev.name();
        self.tx.send(ev).await.map_err(|_| {
            debug!(target: "contextor::events", event = name, "receiver dropped");
            ContextorError::ClientGone
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn chat_order_is_enforced() {
        let (mut sink, mut rx) = EventSink::channel();
        assert!(matches!(
            sink.token("early".into()).await,
            Err(ContextorError::StreamState(_))
        ));
        sink.sources(vec![]).await.unwrap();
        sink.token("a".into()).await.unwrap();
        sink.suggestions(vec!["q?".into()]).await.unwrap();
        assert!(sink.token("late".into()).await.is_err());
        sink.done().await.unwrap();
        assert!(sink.error("again").await.is_err());
        assert!(sink.is_finished());
        drop(sink);

        let mut names = Vec::new();
        while let Some(ev) = rx.recv().await {
            names.push(ev.name());
        }
        assert_eq!(names, ["sources", "token", "suggestions", "done"]);
    }

    #[tokio::test]
    async fn error_is_terminal_mid_answer() {
        let (mut sink, mut rx) = EventSink::channel();
        sink.sources(vec![]).await.unwrap();
        sink.token("partial".into()).await.unwrap();
        sink.error("upstream failed").await.unwrap();
        assert!(sink.done().await.is_err());
        drop(sink);

        let mut last = None;
        while let Some(ev) = rx.recv().await {
            last = Some(ev);
        }
        assert!(last.is_some_and(|e| e.is_terminal() && e.name() == "error"));
    }

    #[tokio::test]
    async fn dropped_receiver_reports_client_gone() {
        let (mut sink, rx) = EventSink::channel();
        drop(rx);
        assert!(sink.is_closed());
        assert!(matches!(
            sink.sources(vec![]).await,
            Err(ContextorError::ClientGone)
        ));
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let v = serde_json::to_value(StreamEvent::Token {
            content: "hi".into(),
        })
        .unwrap();
        assert_eq!(v, serde_json::json!({"type": "token", "content": "hi"}));
        assert_eq!(
            serde_json::to_value(StreamEvent::Done).unwrap(),
            serde_json::json!({"type": "done"})
        );
    }
}
