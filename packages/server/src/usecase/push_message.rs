//! UseCase: サーバーからセッションへのメッセージ送信
//!
//! オペレーターの返信など、WebSocket 以外の経路から特定のセッションへ
//! `message_received` を届けます。保存は呼び出し側の責務です。

use serde_json::json;

use crate::{
    domain::{MessageContent, Sender, SessionId, Timestamp},
    hub::Hub,
    infrastructure::dto::websocket::{Envelope, OutboundKind},
};

use super::error::SessionActionError;

/// セッション宛てメッセージ送信のユースケース
pub struct PushMessageUseCase {
    hub: Hub,
}

impl PushMessageUseCase {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 接続のバッファに積まれた
    /// * `Err(SessionActionError::SessionNotConnected)` - 該当する接続がない
    pub async fn execute(
        &self,
        session_id: String,
        content: String,
        sender: Sender,
    ) -> Result<(), SessionActionError> {
        let session_id = SessionId::try_from(session_id)?;
        let content = MessageContent::try_from(content)?;

        let envelope = Envelope::outbound(
            OutboundKind::MessageReceived,
            json!({
                "session_id": session_id.as_str(),
                "content": content.as_str(),
                "sender": sender,
                "timestamp": Timestamp::now().value(),
            }),
        );

        if !self
            .hub
            .broadcast_to_session(session_id.clone(), envelope)
            .await?
        {
            return Err(SessionActionError::SessionNotConnected(session_id.into_string()));
        }

        tracing::info!(session_id = %session_id, sender = %sender, "Pushed message to session");
        Ok(())
    }
}
