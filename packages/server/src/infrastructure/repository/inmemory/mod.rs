//! In-memory collaborators standing in for the relational store.

mod chat;
mod tenant;

pub use chat::InMemoryChatRepository;
pub use tenant::InMemoryTenantResolver;
