//! UI-agnostic conversation types
//!
//! This module contains data structures that are shared between front ends
//! and don't depend on any specific UI framework.

use crate::markdown::RenderedContent;

/// A chat message in the conversation
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    /// Source text as typed by the user or streamed by the service (markdown)
    pub content: String,
    /// Cached formatted output, assistant messages only
    pub rendered: Option<RenderedContent>,
    pub timestamp: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            rendered: None,
            timestamp: now_timestamp(),
        }
    }

    /// An empty assistant message, ready to receive streamed text
    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            rendered: None,
            timestamp: now_timestamp(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

fn now_timestamp() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_starts_empty() {
        let msg = Message::assistant();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.rendered.is_none());
    }

    #[test]
    fn test_timestamp_is_hours_and_minutes() {
        let msg = Message::user("hi");
        assert_eq!(msg.timestamp.len(), 5);
        assert_eq!(msg.timestamp.as_bytes()[2], b':');
    }
}
