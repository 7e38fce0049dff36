//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層と Hub を操作します。

pub mod close_session;
pub mod error;
pub mod open_session;
pub mod push_message;

pub use close_session::CloseSessionUseCase;
pub use error::{ConnectError, SessionActionError};
pub use open_session::OpenSessionUseCase;
pub use push_message::PushMessageUseCase;
