//! Turns retrieved chunks into the numbered context block fed to the model.

use rag_store::RetrievedChunk;

/// Placeholder context used when retrieval produced nothing.
pub const NO_CONTEXT_SENTINEL: &str =
    "No relevant context was found in the knowledge base for this question.";

/// `"[1] text\n\n[2] text..."`, numbered from 1 in input order; empty input
/// yields [`NO_CONTEXT_SENTINEL`].
pub fn assemble_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_CONTEXT_SENTINEL.to_string();
    }
    chunks
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i + 1, c.text.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rag_store::Metadata;

    fn chunk(text: &str) -> RetrievedChunk {
        RetrievedChunk {
            id: text.into(),
            text: text.into(),
            metadata: Metadata::new(),
            distance: 0.1,
        }
    }

    #[test]
    fn numbers_chunks_in_order() {
        let ctx = assemble_context(&[chunk("alpha"), chunk(" beta\n")]);
        assert_eq!(ctx, "[1] alpha\n\n[2] beta");
    }

    #[test]
    fn empty_yields_sentinel() {
        assert_eq!(assemble_context(&[]), NO_CONTEXT_SENTINEL);
    }
}
