use log::info;
use serde::{Deserialize, Serialize};

use crate::completion::Completer;
use crate::study::prompts::CHAT_PROMPT;
use crate::text::truncate_chars;

/// Context characters sent with a chat question
pub const CHAT_CONTEXT_CHARS: usize = 5_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    /// Short context the client chose to send
    #[serde(default)]
    pub context: String,
    pub question: String,
    /// Full study material, preferred over `context` when present
    #[serde(default)]
    pub full_content: String,
}

impl ChatRequest {
    fn grounding(&self) -> &str {
        if self.full_content.trim().is_empty() { &self.context } else { &self.full_content }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
}

/// Single-turn tutor answer; a failed completion comes back as marker text.
pub async fn respond(completer: &dyn Completer, request: &ChatRequest) -> ChatAnswer {
    info!("Answering chat question ({} chars)", request.question.len());
    let prompt = chat_prompt(request);
    let answer = match completer.complete(&prompt).await {
        Ok(answer) => answer,
        Err(e) => e.marked(),
    };
    ChatAnswer { answer }
}

fn chat_prompt(request: &ChatRequest) -> String {
    let context = truncate_chars(request.grounding().trim(), CHAT_CONTEXT_CHARS);
    format!(
        "{CHAT_PROMPT}\n\nSTUDY MATERIAL:\n{context}\n\nQUESTION:\n{}",
        request.question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionError;
    use crate::testing::ScriptedCompleter;

    #[tokio::test]
    async fn test_answer_passes_through() {
        let completer = ScriptedCompleter::new(vec![Ok("Mitochondria.".into())]);
        let request = ChatRequest {
            question: "What makes ATP?".into(),
            full_content: "Mitochondria make ATP.".into(),
            ..Default::default()
        };
        let answer = respond(&completer, &request).await;
        assert_eq!(answer.answer, "Mitochondria.");

        let sent = &completer.prompts()[0];
        assert!(sent.contains("Mitochondria make ATP."));
        assert!(sent.ends_with("QUESTION:\nWhat makes ATP?"));
    }

    #[tokio::test]
    async fn test_failure_is_marker_text() {
        let completer = ScriptedCompleter::new(vec![Err(CompletionError::Transport("connection reset".into()))]);
        let request = ChatRequest {
            question: "Why?".into(),
            ..Default::default()
        };
        let answer = respond(&completer, &request).await;
        assert_eq!(answer.answer, "Error: request failed: connection reset");
    }

    #[test]
    fn test_context_truncated_and_fallback() {
        let request = ChatRequest {
            context: "short context".into(),
            question: "q".into(),
            full_content: String::new(),
        };
        assert!(chat_prompt(&request).contains("short context"));

        let request = ChatRequest {
            context: "ignored".into(),
            question: "q".into(),
            full_content: "y".repeat(CHAT_CONTEXT_CHARS + 100),
        };
        let prompt = chat_prompt(&request);
        assert!(!prompt.contains("ignored"));
        assert!(prompt.contains(&"y".repeat(CHAT_CONTEXT_CHARS)));
        assert!(!prompt.contains(&"y".repeat(CHAT_CONTEXT_CHARS + 1)));
    }

    #[test]
    fn test_request_defaults() {
        let request: ChatRequest = serde_json::from_str(r#"{"question":"hi"}"#).unwrap();
        assert!(request.context.is_empty());
        assert!(request.full_content.is_empty());
    }
}
