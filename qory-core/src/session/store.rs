//! Session data structures

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::message::{Message, Role};
use crate::utils::truncate_chars;

/// Number of characters kept from the last user message in a preview
pub const PREVIEW_CHARS: usize = 64;

/// A conversation session.
///
/// The session does not carry its ID: identity is the storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Messages in chronological order
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Session {
    /// Create an empty session
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to the session
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Content of the most recent user message, if any
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Preview snippet: the last user message truncated to [`PREVIEW_CHARS`]
    pub fn snippet(&self) -> Option<String> {
        self.last_user_content()
            .map(|content| truncate_chars(content, PREVIEW_CHARS))
    }
}

/// Read-only listing entry for a stored session
#[derive(Debug, Clone)]
pub struct SessionPreview {
    /// Session ID (the file name)
    pub id: String,
    /// Last modification time of the session file
    pub updated_at: DateTime<Local>,
    /// Truncated last user message
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = Session::new();
        assert!(session.is_empty());
        assert_eq!(session.snippet(), None);
    }

    #[test]
    fn test_add_message() {
        let mut session = Session::new();
        session.add_message(Message::user("Hello"));
        session.add_message(Message::assistant("Hi there!"));

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[1].role, Role::Assistant);
    }

    #[test]
    fn test_snippet_uses_last_user_message() {
        let mut session = Session::new();
        session.add_message(Message::system("be brief"));
        session.add_message(Message::user("first"));
        session.add_message(Message::assistant("answer"));
        session.add_message(Message::user("second"));
        session.add_message(Message::assistant("another answer"));

        assert_eq!(session.snippet().as_deref(), Some("second"));
    }

    #[test]
    fn test_snippet_truncates_long_content() {
        let long = "x".repeat(100);
        let mut session = Session::new();
        session.add_message(Message::user(long));

        let snippet = session.snippet().unwrap();
        assert_eq!(snippet, format!("{}...", "x".repeat(PREVIEW_CHARS)));
    }

    #[test]
    fn test_snippet_keeps_exact_length_content() {
        let exact = "y".repeat(PREVIEW_CHARS);
        let mut session = Session::new();
        session.add_message(Message::user(exact.clone()));
        assert_eq!(session.snippet().unwrap(), exact);
    }

    #[test]
    fn test_file_format() {
        let mut session = Session::new();
        session.add_message(Message::user("q"));
        let json = serde_json::to_string(&session).unwrap();
        assert_eq!(json, r#"{"messages":[{"role":"user","content":"q"}]}"#);
    }
}
