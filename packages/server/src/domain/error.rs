//! Domain layer error definitions.

use thiserror::Error;

use super::value_object::ChatId;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// TenantKey validation error
    #[error("TenantKey cannot be empty")]
    TenantKeyEmpty,

    /// TenantKey too long error
    #[error("TenantKey cannot exceed {max} characters (got {actual})")]
    TenantKeyTooLong { max: usize, actual: usize },

    /// SessionId validation error
    #[error("SessionId cannot be empty")]
    SessionIdEmpty,

    /// SessionId too long error
    #[error("SessionId cannot exceed {max} characters (got {actual})")]
    SessionIdTooLong { max: usize, actual: usize },

    /// WidgetKey validation error
    #[error("WidgetKey cannot be empty")]
    WidgetKeyEmpty,

    /// WidgetKey does not match `cw_<16 hex>_<16 hex>`
    #[error("WidgetKey has an invalid format (got: {0})")]
    WidgetKeyInvalidFormat(String),

    /// MessageContent validation error
    #[error("MessageContent cannot be empty")]
    MessageContentEmpty,

    /// MessageContent too long error
    #[error("MessageContent cannot exceed {max} characters (got {actual})")]
    MessageContentTooLong { max: usize, actual: usize },
}

/// Errors returned by the chat store collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatStoreError {
    #[error("Chat {0} not found")]
    ChatNotFound(ChatId),

    /// The backing store could not serve the request
    #[error("Chat store unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned when resolving a widget key to its tenant
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Widget '{0}' not found")]
    NotFound(String),

    #[error("Widget '{0}' is disabled")]
    Disabled(String),
}
