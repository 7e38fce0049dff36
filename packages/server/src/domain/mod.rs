//! Domain layer for the chat hub.
//!
//! This module contains business types that are independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod entity;
pub mod error;
pub mod factory;
pub mod repository;
pub mod value_object;

pub use entity::{Chat, ChatMessage, Sender, VisitorMetadata};
pub use error::{ChatStoreError, ResolveError, ValueObjectError};
pub use factory::ConnectionIdFactory;
pub use repository::{ChatRepository, TenantResolver};
pub use value_object::{
    ChatId, ConnectionId, MessageContent, MessageId, SessionId, TenantKey, Timestamp, WidgetKey,
};
