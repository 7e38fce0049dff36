//! WebSocket message DTOs for the chat hub.
//!
//! Every frame in both directions is an [`Envelope`]:
//!
//! ```json
//! {"type": "chat_message", "data": {"content": "hi"}, "session_id": "s1", "tenant_key": "42", "timestamp": 1700000000}
//! ```
//!
//! Clients only get to choose `type` and `data`. Inbound frames are parsed
//! into [`InboundEnvelope`], which ignores any identity fields the client
//! sent, and then stamped with the connection's own identity.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{SessionId, TenantKey, Timestamp};

/// Envelope exchanged over a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub r#type: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_key: Option<String>,
    #[serde(default)]
    pub timestamp: i64,
}

impl Envelope {
    /// Build a server-originated envelope.
    pub fn outbound(kind: OutboundKind, data: Value) -> Self {
        Self {
            r#type: kind.as_str().to_string(),
            data,
            session_id: None,
            tenant_key: None,
            timestamp: Timestamp::now().value(),
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inbound frame as read from the client, before stamping
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    pub r#type: String,
    #[serde(default)]
    pub data: Value,
}

impl InboundEnvelope {
    /// Parse a raw frame body.
    pub fn parse(raw: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(raw)
    }

    /// Attach the sending connection's identity and the server time.
    pub fn stamp(self, session_id: &SessionId, tenant: &TenantKey, at: Timestamp) -> Envelope {
        Envelope {
            r#type: self.r#type,
            data: self.data,
            session_id: Some(session_id.as_str().to_string()),
            tenant_key: Some(tenant.as_str().to_string()),
            timestamp: at.value(),
        }
    }
}

/// Verbs a client may send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InboundKind {
    JoinChat,
    LeaveChat,
    ChatMessage,
    TypingStart,
    TypingStop,
    Ping,
}

impl InboundKind {
    /// Look up a verb by its wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        serde_json::from_value(Value::String(name.to_string())).ok()
    }
}

/// Message type enum for server-originated envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundKind {
    ConnectionEstablished,
    ChatHistory,
    BotMessage,
    MessageReceived,
    UserTyping,
    UserStoppedTyping,
    Pong,
}

impl OutboundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished => "connection_established",
            Self::ChatHistory => "chat_history",
            Self::BotMessage => "bot_message",
            Self::MessageReceived => "message_received",
            Self::UserTyping => "user_typing",
            Self::UserStoppedTyping => "user_stopped_typing",
            Self::Pong => "pong",
        }
    }
}

/// `data` of an inbound `chat_message`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMessagePayload {
    pub content: String,
}

/// One entry of `chat_history.data.messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: u64,
    pub content: String,
    pub sender: String,
    pub timestamp: i64,
    pub language: String,
}
