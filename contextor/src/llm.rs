//! Chat seam between the pipeline and the language-model provider.

use ai_llm_service::{AiLlmError, ChatMessage, LlmServiceProfiles, TokenStream};
use async_trait::async_trait;

/// Minimal chat contract used by the generator.
///
/// `complete` and `stream` run on the answer (slow) profile; `complete_fast`
/// is used for auxiliary calls such as suggestions.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError>;

    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, AiLlmError>;

    async fn complete_fast(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.complete(messages).await
    }
}

#[async_trait]
impl ChatBackend for LlmServiceProfiles {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat_slow(messages).await
    }

    async fn stream(&self, messages: &[ChatMessage]) -> Result<TokenStream, AiLlmError> {
        self.stream_slow(messages).await
    }

    async fn complete_fast(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat_fast(messages).await
    }
}
