//! メッセージハンドラ
//!
//! クライアントが送る各 verb（join_chat, chat_message など）の処理。
//! ハンドラは Hub ループ上で 1 件ずつ実行され、共有状態には触れません。
//! 送信先の決定だけを [`Outgoing`] として返し、実際の配送は Hub が行います。
//!
//! チャットストアへの呼び出しは `HubSettings::store_timeout` で打ち切られ、
//! 失敗してもログを残して処理を続けます。

use std::{future::Future, time::Duration};

use serde_json::json;

use crate::{
    domain::{ChatRepository, ChatStoreError, MessageContent, Sender, Timestamp},
    infrastructure::dto::websocket::{
        ChatMessagePayload, Envelope, HistoryItem, InboundKind, OutboundKind,
    },
};

use super::{ConnectionHandle, HubSettings};

/// Where a handler wants an envelope delivered
#[derive(Debug, Clone, PartialEq)]
pub enum Outgoing {
    /// Only the connection that sent the inbound envelope
    ToSource(Envelope),
    /// Every connection of the source's tenant, source included
    ToTenant(Envelope),
    /// Every connection of the source's tenant except the source
    ToTenantExceptSource(Envelope),
}

/// Run the handler for `kind`.
pub async fn handle(
    kind: InboundKind,
    source: &ConnectionHandle,
    envelope: &Envelope,
    chats: &dyn ChatRepository,
    settings: &HubSettings,
) -> Vec<Outgoing> {
    match kind {
        InboundKind::JoinChat => join_chat(source, chats, settings).await,
        InboundKind::LeaveChat => leave_chat(source),
        InboundKind::ChatMessage => chat_message(source, envelope, chats, settings).await,
        InboundKind::TypingStart => typing(source, OutboundKind::UserTyping),
        InboundKind::TypingStop => typing(source, OutboundKind::UserStoppedTyping),
        InboundKind::Ping => ping(),
    }
}

async fn join_chat(
    source: &ConnectionHandle,
    chats: &dyn ChatRepository,
    settings: &HubSettings,
) -> Vec<Outgoing> {
    tracing::info!(tenant = %source.tenant, session_id = %source.session_id, "Client joined chat");

    let history = with_deadline(
        settings.store_timeout,
        chats.recent_history(source.chat_id, settings.history_limit),
    )
    .await
    .unwrap_or_else(|e| {
        tracing::warn!(session_id = %source.session_id, chat_id = %source.chat_id, error = %e, "Failed to load chat history");
        Vec::new()
    });

    let messages: Vec<HistoryItem> = history
        .into_iter()
        .map(|message| HistoryItem {
            id: message.id.value(),
            content: message.content.into_string(),
            sender: message.sender.to_string(),
            timestamp: message.timestamp.value(),
            language: message.language,
        })
        .collect();

    vec![
        Outgoing::ToSource(Envelope::outbound(
            OutboundKind::ChatHistory,
            json!({
                "chat_id": source.chat_id.value(),
                "messages": messages,
            }),
        )),
        Outgoing::ToSource(Envelope::outbound(
            OutboundKind::BotMessage,
            json!({
                "content": settings.welcome_message,
                "sender": Sender::Bot,
                "timestamp": Timestamp::now().value(),
            }),
        )),
    ]
}

fn leave_chat(source: &ConnectionHandle) -> Vec<Outgoing> {
    tracing::info!(tenant = %source.tenant, session_id = %source.session_id, "Client left chat");
    Vec::new()
}

async fn chat_message(
    source: &ConnectionHandle,
    envelope: &Envelope,
    chats: &dyn ChatRepository,
    settings: &HubSettings,
) -> Vec<Outgoing> {
    let content = match serde_json::from_value::<ChatMessagePayload>(envelope.data.clone())
        .ok()
        .and_then(|payload| MessageContent::new(payload.content).ok())
    {
        Some(content) => content,
        None => {
            tracing::warn!(session_id = %source.session_id, "Ignoring chat message without valid content");
            return Vec::new();
        }
    };

    let message_id = match with_deadline(
        settings.store_timeout,
        chats.append_message(source.chat_id, &content, Sender::User),
    )
    .await
    {
        Ok(id) => Some(id.value()),
        Err(e) => {
            // Still broadcast, without a message id
            tracing::warn!(session_id = %source.session_id, chat_id = %source.chat_id, error = %e, "Failed to persist chat message");
            None
        }
    };

    tracing::debug!(tenant = %source.tenant, session_id = %source.session_id, "Chat message received");

    vec![Outgoing::ToTenant(Envelope::outbound(
        OutboundKind::MessageReceived,
        json!({
            "session_id": source.session_id.as_str(),
            "content": content.as_str(),
            "sender": Sender::User,
            "timestamp": envelope.timestamp,
            "message_id": message_id,
        }),
    ))]
}

fn typing(source: &ConnectionHandle, kind: OutboundKind) -> Vec<Outgoing> {
    vec![Outgoing::ToTenantExceptSource(Envelope::outbound(
        kind,
        json!({ "session_id": source.session_id.as_str() }),
    ))]
}

fn ping() -> Vec<Outgoing> {
    vec![Outgoing::ToSource(Envelope::outbound(
        OutboundKind::Pong,
        json!({ "timestamp": Timestamp::now().value() }),
    ))]
}

async fn with_deadline<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ChatStoreError>>,
) -> Result<T, ChatStoreError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ChatStoreError::Unavailable(format!("timed out after {limit:?}"))))
}
