//! Prompt builders: system message, bounded history, context block.

use ai_llm_service::ChatMessage;

use crate::api_types::HistoryMessage;

/// Default system instructions for groundwater answers.
pub const DEFAULT_SYSTEM: &str = r#"
You are a groundwater resource assistant for Indian state and central assessment reports.
Answer using the numbered context passages as ground truth and cite them as [n].
Keep figures exactly as written in the context, including units and years.
If the context is insufficient, say so plainly instead of guessing.
"#;

const SUGGEST_SYSTEM: &str = r#"
You propose short follow-up questions about groundwater data.
Reply with one question per line and nothing else.
"#;

/// Messages for an answer: system, the last `max_history` turns, then the
/// question together with its context.
///
/// # Example
/// ```
/// # use contextor::prompt::build_messages;
/// let msgs = build_messages("Recharge in Goa?", "[1] Goa recharge is 0.3 bcm", &[], 6);
/// assert_eq!(msgs.len(), 2);
/// assert!(msgs[1].content.contains("Question:"));
/// ```
pub fn build_messages(
    query: &str,
    context: &str,
    history: &[HistoryMessage],
    max_history: usize,
) -> Vec<ChatMessage> {
    let start = history.len().saturating_sub(max_history);
    let mut out = Vec::with_capacity(history.len() - start + 2);
    out.push(ChatMessage::system(DEFAULT_SYSTEM.trim()));
    out.extend(history[start..].iter().map(HistoryMessage::to_chat));
    out.push(ChatMessage::user(user_prompt(query, context)));
    out
}

fn user_prompt(query: &str, context: &str) -> String {
    format!(
        "Context:\n{}\n\nQuestion:\n{}\n\nAnswer using the context above when possible.",
        context.trim(),
        query.trim()
    )
}

/// Messages asking for `count` follow-up questions.
pub fn build_suggestion_messages(query: &str, context: &str, count: usize) -> Vec<ChatMessage> {
    let user = format!(
        "The user asked:\n{}\n\nRelevant data:\n{}\n\nWrite {count} short follow-up questions the user might ask next.",
        query.trim(),
        safe_truncate(context.trim(), 2_000)
    );
    vec![
        ChatMessage::system(SUGGEST_SYSTEM.trim()),
        ChatMessage::user(user),
    ]
}

/// Extracts up to `count` questions from a model reply, stripping list markers.
pub fn parse_suggestions(reply: &str, count: usize) -> Vec<String> {
    reply
        .lines()
        .map(|l| {
            l.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '-' | '*' | '.' | ')' | '•'))
                .trim()
                .trim_matches('"')
                .to_string()
        })
        .filter(|l| l.len() > 3 && l.ends_with('?'))
        .take(count)
        .collect()
}

fn safe_truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        s
    } else {
        let mut end = max;
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        &s[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::ChatRole;

    fn turn(role: &str, content: &str) -> HistoryMessage {
        HistoryMessage {
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn history_is_bounded_to_most_recent_turns() {
        let history: Vec<_> = (0..10).map(|i| turn("user", &format!("q{i}"))).collect();
        let msgs = build_messages("now?", "ctx", &history, 6);
        assert_eq!(msgs.len(), 8);
        assert_eq!(msgs[0].role, ChatRole::System);
        assert_eq!(msgs[1].content, "q4");
        assert!(msgs[7].content.contains("now?"));
        assert!(msgs[7].content.contains("ctx"));
    }

    #[test]
    fn suggestions_are_cleaned_and_capped() {
        let reply = "1. What about Punjab?\n- How did recharge change?\nnot a question\n* Which blocks are critical?\n\"Is Goa safe?\"";
        let got = parse_suggestions(reply, 3);
        assert_eq!(
            got,
            vec![
                "What about Punjab?",
                "How did recharge change?",
                "Which blocks are critical?"
            ]
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "ééé";
        assert_eq!(safe_truncate(s, 3), "é");
    }
}
