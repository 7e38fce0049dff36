//! Collaborator interfaces consumed by the hub.
//!
//! The hub never talks to a database directly. Chat persistence and widget
//! resolution are reached through these traits; the infrastructure layer
//! provides in-memory implementations.

use async_trait::async_trait;

use super::{
    Chat, ChatId, ChatMessage, ChatStoreError, MessageContent, MessageId, ResolveError, Sender,
    SessionId, TenantKey, VisitorMetadata, WidgetKey,
};

/// Chat persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Return the active chat for `(tenant, session_id)`, creating it if needed.
    async fn create_or_get_chat(
        &self,
        tenant: &TenantKey,
        session_id: &SessionId,
        metadata: &VisitorMetadata,
    ) -> Result<Chat, ChatStoreError>;

    /// Append a message to a chat.
    async fn append_message(
        &self,
        chat_id: ChatId,
        content: &MessageContent,
        sender: Sender,
    ) -> Result<MessageId, ChatStoreError>;

    /// The latest `limit` messages of a chat, oldest first.
    async fn recent_history(
        &self,
        chat_id: ChatId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ChatStoreError>;
}

/// Widget key to tenant resolution
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve(&self, widget_key: &WidgetKey) -> Result<TenantKey, ResolveError>;
}
