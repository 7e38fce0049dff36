//! InMemory Chat Repository 実装
//!
//! ドメイン層が定義する ChatRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。プロセス終了時に内容は失われます。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Chat, ChatId, ChatMessage, ChatRepository, ChatStoreError, MessageContent, MessageId, Sender,
    SessionId, TenantKey, Timestamp, VisitorMetadata,
};

#[derive(Default)]
struct ChatStore {
    chats: HashMap<ChatId, Chat>,
    /// Active chat per (tenant, session)
    by_session: HashMap<(TenantKey, SessionId), ChatId>,
    messages: HashMap<ChatId, Vec<ChatMessage>>,
    next_chat_id: u64,
    next_message_id: u64,
}

/// インメモリ Chat Repository 実装
#[derive(Default)]
pub struct InMemoryChatRepository {
    store: Mutex<ChatStore>,
}

impl InMemoryChatRepository {
    /// 新しい InMemoryChatRepository を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みチャット数
    pub async fn chat_count(&self) -> usize {
        self.store.lock().await.chats.len()
    }
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn create_or_get_chat(
        &self,
        tenant: &TenantKey,
        session_id: &SessionId,
        metadata: &VisitorMetadata,
    ) -> Result<Chat, ChatStoreError> {
        let mut store = self.store.lock().await;

        let key = (tenant.clone(), session_id.clone());
        if let Some(chat) = store
            .by_session
            .get(&key)
            .and_then(|chat_id| store.chats.get(chat_id))
        {
            return Ok(chat.clone());
        }

        store.next_chat_id += 1;
        let chat = Chat {
            id: ChatId::new(store.next_chat_id),
            tenant: tenant.clone(),
            session_id: session_id.clone(),
            metadata: metadata.clone(),
            started_at: Timestamp::now(),
        };
        store.by_session.insert(key, chat.id);
        store.chats.insert(chat.id, chat.clone());

        tracing::debug!(chat_id = %chat.id, tenant = %tenant, session_id = %session_id, "Chat created");
        Ok(chat)
    }

    async fn append_message(
        &self,
        chat_id: ChatId,
        content: &MessageContent,
        sender: Sender,
    ) -> Result<MessageId, ChatStoreError> {
        let mut store = self.store.lock().await;

        let language = store
            .chats
            .get(&chat_id)
            .map(|chat| chat.metadata.language.clone())
            .ok_or(ChatStoreError::ChatNotFound(chat_id))?;

        store.next_message_id += 1;
        let message = ChatMessage {
            id: MessageId::new(store.next_message_id),
            chat_id,
            content: content.clone(),
            sender,
            language,
            timestamp: Timestamp::now(),
        };
        let id = message.id;
        store.messages.entry(chat_id).or_default().push(message);

        Ok(id)
    }

    async fn recent_history(
        &self,
        chat_id: ChatId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ChatStoreError> {
        let store = self.store.lock().await;

        if !store.chats.contains_key(&chat_id) {
            return Err(ChatStoreError::ChatNotFound(chat_id));
        }

        let messages = store.messages.get(&chat_id).map(Vec::as_slice).unwrap_or(&[]);
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}
