//! UseCase: セッション開始処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - OpenSessionUseCase::execute() メソッド
//! - ウィジェットキーからテナントを解決し、チャットを作成（または取得）する処理
//!
//! ### なぜこのテストが必要か
//! - 不正なウィジェットキー・セッション ID で接続が作られないことを保証
//! - 無効化されたウィジェットを拒否することを確認
//! - 返された ConnectionHandle がテナントとチャットを正しく保持することを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なウィジェットでの接続
//! - 異常系：形式不正、未登録、無効化、チャット作成失敗
//! - エッジケース：同じセッションの再接続（同じチャットを再利用）

use std::sync::Arc;

use crate::{
    domain::{ChatRepository, SessionId, TenantResolver, VisitorMetadata, WidgetKey},
    hub::ConnectionHandle,
};

use super::error::ConnectError;

/// セッション開始のユースケース
pub struct OpenSessionUseCase {
    tenants: Arc<dyn TenantResolver>,
    chats: Arc<dyn ChatRepository>,
}

impl OpenSessionUseCase {
    /// 新しい OpenSessionUseCase を作成
    pub fn new(tenants: Arc<dyn TenantResolver>, chats: Arc<dyn ChatRepository>) -> Self {
        Self { tenants, chats }
    }

    /// セッション開始を実行
    ///
    /// # Arguments
    ///
    /// * `widget_key` - URL パスのウィジェットキー
    /// * `session_id` - クエリパラメータのセッション ID
    /// * `metadata` - リクエストヘッダから取得した訪問者情報
    ///
    /// # Returns
    ///
    /// * `Ok(ConnectionHandle)` - Hub に登録する接続の識別情報
    /// * `Err(ConnectError)` - 接続拒否
    pub async fn execute(
        &self,
        widget_key: String,
        session_id: String,
        metadata: VisitorMetadata,
    ) -> Result<ConnectionHandle, ConnectError> {
        // 1. String -> Domain Model
        let widget_key = WidgetKey::try_from(widget_key)?;
        let session_id = SessionId::try_from(session_id)?;

        // 2. テナント解決
        let tenant = self.tenants.resolve(&widget_key).await?;

        // 3. チャットの作成（既存ならそのまま取得）
        let chat = self
            .chats
            .create_or_get_chat(&tenant, &session_id, &metadata)
            .await?;

        tracing::info!(
            tenant = %tenant,
            session_id = %session_id,
            chat_id = %chat.id,
            ip = %metadata.ip,
            language = %metadata.language,
            "Session opened"
        );

        Ok(ConnectionHandle::new(session_id, tenant, chat.id))
    }
}
