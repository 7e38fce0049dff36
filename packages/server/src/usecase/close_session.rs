//! UseCase: サーバーからのセッション切断

use crate::{domain::SessionId, hub::Hub};

use super::error::SessionActionError;

/// セッション切断のユースケース
pub struct CloseSessionUseCase {
    hub: Hub,
}

impl CloseSessionUseCase {
    pub fn new(hub: Hub) -> Self {
        Self { hub }
    }

    /// セッションの接続を Hub から外し、送信バッファを閉じる
    ///
    /// 書き込み側はバッファが閉じたことを検知して close フレームを送ります。
    pub async fn execute(&self, session_id: String) -> Result<(), SessionActionError> {
        let session_id = SessionId::try_from(session_id)?;

        if !self.hub.close_session(session_id.clone()).await? {
            return Err(SessionActionError::SessionNotConnected(session_id.into_string()));
        }
        Ok(())
    }
}
