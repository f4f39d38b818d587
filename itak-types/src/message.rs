//! Message and History types (spec §3 "Message").
//!
//! A conversation is an ordered sequence of [`Message`]s. The system message,
//! if present, is always index 0 and is never evicted during trimming.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Who produced a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    /// Tags this message as having arrived via an intervention, per
    /// spec.md §4.1 step "Intervention delivery": the text is prefixed
    /// with `"[INTERVENTION] "` and the role is forced to `user`.
    pub fn intervention(content: impl Into<String>) -> Self {
        Self::new(Role::User, format!("[INTERVENTION] {}", content.into()))
    }
}

/// An ordered, append-only conversation history.
///
/// Invariant: strictly monotonic in append order. Trimming (not implemented
/// here; the caller decides a budget) removes only the oldest non-system
/// messages, never the pinned system message at index 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History(Vec<Message>);

impl History {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    /// Returns up to the last `n` messages, for checkpoint snapshots
    /// (spec.md §3 "CheckpointSnapshot" bounds history to the last 50).
    pub fn tail(&self, n: usize) -> &[Message] {
        let start = self.0.len().saturating_sub(n);
        &self.0[start..]
    }

    /// Trims the oldest non-system messages until the total is at or below
    /// `max_len`. The system message at index 0, if present, is preserved.
    pub fn trim_to(&mut self, max_len: usize) {
        if self.0.len() <= max_len {
            return;
        }
        let has_system = matches!(self.0.first(), Some(m) if m.role == Role::System);
        let keep_from_end = if has_system { max_len - 1 } else { max_len };
        let drop_start = if has_system { 1 } else { 0 };
        let drop_end = self.0.len().saturating_sub(keep_from_end);
        if drop_end > drop_start {
            self.0.drain(drop_start..drop_end);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervention_tags_and_forces_user_role() {
        let m = Message::intervention("actually search for X");
        assert_eq!(m.role, Role::User);
        assert_eq!(m.content, "[INTERVENTION] actually search for X");
    }

    #[test]
    fn history_append_order_is_monotonic() {
        let mut h = History::new();
        h.push(Message::user("a"));
        h.push(Message::assistant("b"));
        assert_eq!(h.len(), 2);
        assert_eq!(h.as_slice()[0].content, "a");
        assert_eq!(h.as_slice()[1].content, "b");
    }

    #[test]
    fn tail_returns_at_most_n() {
        let mut h = History::new();
        for i in 0..10 {
            h.push(Message::user(format!("{i}")));
        }
        assert_eq!(h.tail(3).len(), 3);
        assert_eq!(h.tail(100).len(), 10);
    }

    #[test]
    fn trim_preserves_system_message() {
        let mut h = History::new();
        h.push(Message::system("you are an agent"));
        for i in 0..10 {
            h.push(Message::user(format!("{i}")));
        }
        h.trim_to(3);
        assert_eq!(h.len(), 3);
        assert_eq!(h.as_slice()[0].role, Role::System);
    }
}
