use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    /// A failed model call. Rendered apart from real replies, sent to the model as `assistant`.
    Error,
}

impl Role {
    /// Role name on the chat-completions wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant | Self::Error => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

/// Append-only chat log.
///
/// Unbounded unless built with [`ChatSession::with_max_turns`], in which case
/// the oldest turns are evicted first.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: VecDeque<ChatTurn>,
    max_turns: Option<usize>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: Some(max_turns.max(1)),
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) -> &ChatTurn {
        if let Some(max) = self.max_turns {
            while self.turns.len() >= max {
                self.turns.pop_front();
            }
        }
        self.turns.push_back(ChatTurn {
            role,
            content: content.into(),
        });
        &self.turns[self.turns.len() - 1]
    }

    /// The last `k` turns in append order; fewer when the log is shorter.
    pub fn tail(&self, k: usize) -> impl DoubleEndedIterator<Item = &ChatTurn> + '_ {
        let start = self.turns.len().saturating_sub(k);
        self.turns.range(start..)
    }

    pub fn all(&self) -> impl DoubleEndedIterator<Item = &ChatTurn> + '_ {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents<'a>(it: impl Iterator<Item = &'a ChatTurn>) -> Vec<&'a str> {
        it.map(|t| t.content.as_str()).collect()
    }

    #[test]
    fn tail_clamps_to_available_history() {
        let mut s = ChatSession::new();
        assert_eq!(s.tail(6).count(), 0);
        s.append(Role::User, "q1");
        s.append(Role::Assistant, "a1");
        assert_eq!(contents(s.tail(6)), vec!["q1", "a1"]);
        assert_eq!(contents(s.tail(1)), vec!["a1"]);
        assert_eq!(s.tail(0).count(), 0);
    }

    #[test]
    fn unbounded_by_default() {
        let mut s = ChatSession::new();
        for i in 0..1_000 {
            s.append(Role::User, i.to_string());
        }
        assert_eq!(s.len(), 1_000);
        assert_eq!(s.all().next().unwrap().content, "0");
    }

    #[test]
    fn bounded_log_evicts_oldest_first() {
        let mut s = ChatSession::with_max_turns(3);
        for c in ["a", "b", "c", "d", "e"] {
            s.append(Role::User, c);
        }
        assert_eq!(s.len(), 3);
        assert_eq!(contents(s.all()), vec!["c", "d", "e"]);
    }

    #[test]
    fn error_turns_go_out_as_assistant() {
        assert_eq!(Role::Error.wire_name(), "assistant");
        assert_eq!(Role::User.wire_name(), "user");
        let v = serde_json::to_value(ChatTurn {
            role: Role::Error,
            content: "x".to_string(),
        })
        .unwrap();
        assert_eq!(v["role"], "error");
    }
}
