//! Core domain models for the chat hub.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::value_object::{ChatId, MessageContent, MessageId, SessionId, TenantKey, Timestamp};

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The website visitor
    User,
    /// Automated replies (welcome message, assistants)
    Bot,
    /// A human operator replying from the dashboard
    Operator,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
            Sender::Operator => "operator",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Visitor details captured at handshake time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorMetadata {
    /// Client IP as reported by proxies or the socket peer
    pub ip: String,
    pub user_agent: String,
    /// Preferred language (`Accept-Language`), `en` when absent
    pub language: String,
}

impl Default for VisitorMetadata {
    fn default() -> Self {
        Self {
            ip: String::new(),
            user_agent: String::new(),
            language: "en".to_string(),
        }
    }
}

/// A visitor's chat session with one website
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub tenant: TenantKey,
    pub session_id: SessionId,
    pub metadata: VisitorMetadata,
    /// Timestamp when the chat was first opened
    pub started_at: Timestamp,
}

/// A stored chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub content: MessageContent,
    pub sender: Sender,
    pub language: String,
    pub timestamp: Timestamp,
}
