//! UseCase 層のエラー定義

use thiserror::Error;

use crate::{
    domain::{ChatStoreError, ResolveError, ValueObjectError},
    hub::HubError,
};

/// 接続確立時のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConnectError {
    /// ウィジェットキーまたはセッション ID の形式が不正
    #[error("Invalid connection request: {0}")]
    InvalidInput(#[from] ValueObjectError),

    /// ウィジェットキーが登録されていない
    #[error("Widget '{0}' not found")]
    WidgetNotFound(String),

    /// ウィジェットが無効化されている
    #[error("Widget '{0}' is disabled")]
    WidgetDisabled(String),

    /// チャットの作成に失敗
    #[error("Failed to open chat: {0}")]
    ChatStore(#[from] ChatStoreError),
}

impl From<ResolveError> for ConnectError {
    fn from(error: ResolveError) -> Self {
        match error {
            ResolveError::NotFound(key) => ConnectError::WidgetNotFound(key),
            ResolveError::Disabled(key) => ConnectError::WidgetDisabled(key),
        }
    }
}

/// セッション宛ての操作（サーバーからの送信・切断）のエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionActionError {
    #[error("Invalid request: {0}")]
    InvalidInput(#[from] ValueObjectError),

    /// 該当セッションの接続が存在しない
    #[error("Session '{0}' is not connected")]
    SessionNotConnected(String),

    #[error(transparent)]
    Hub(#[from] HubError),
}
