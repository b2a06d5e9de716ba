//! Prompt assembly for the completion boundary.
//!
//! The message order is `[system, prompt, history...]`: the recent turns come
//! *after* the fresh prompt. Callers that need strict chronology must
//! re-sort before dispatch.

use serde::{Deserialize, Serialize};

use crate::resource::{truncate_chars, CONTENT_CAP_CHARS};
use crate::session::ChatTurn;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant that answers questions about documents and web resources.\nRespond concisely but helpfully to user queries.";
pub const CONTEXT_SEPARATOR: &str = "\n\nCurrent resource context:\n";
/// Number of recent turns injected into every request.
pub const HISTORY_WINDOW: usize = 6;
pub const MODEL: &str = "gpt-4-turbo";
pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u64 = 500;
/// Prefix of the chat turn recorded when the model call fails.
pub const ERROR_PREFIX: &str = "Error getting AI response: ";

pub const SUMMARIZE_DOCUMENT_PROMPT: &str = "Summarize this document.";
pub const SUMMARIZE_WEBPAGE_PROMPT: &str = "Summarize this webpage.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl ModelRequest {
    pub fn system(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ContextAssembler {
    system_instruction: String,
    window: usize,
    content_cap: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
            window: HISTORY_WINDOW,
            content_cap: CONTENT_CAP_CHARS,
        }
    }
}

impl ContextAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn build<'a, I>(
        &self,
        user_prompt: &str,
        active_content: Option<&str>,
        history: I,
    ) -> ModelRequest
    where
        I: IntoIterator<Item = &'a ChatTurn>,
    {
        let mut system = self.system_instruction.clone();
        if let Some(content) = active_content.filter(|c| !c.is_empty()) {
            let (content, _) = truncate_chars(content, self.content_cap);
            system.push_str(CONTEXT_SEPARATOR);
            system.push_str(&content);
        }

        let history: Vec<&ChatTurn> = history.into_iter().collect();
        let recent = &history[history.len().saturating_sub(self.window)..];

        let mut messages = Vec::with_capacity(2 + recent.len());
        messages.push(ChatMessage::new("system", system));
        messages.push(ChatMessage::new("user", user_prompt));
        messages.extend(
            recent
                .iter()
                .map(|t| ChatMessage::new(t.role.wire_name(), t.content.clone())),
        );

        ModelRequest {
            model: MODEL.to_string(),
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}
