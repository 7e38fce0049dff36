//! Real-time connection hub for the Chatelly chat widget.
//!
//! Visitors connect over WebSocket with a widget key and a session id. The
//! widget key resolves to a tenant, and every connection of a tenant shares
//! one broadcast domain managed by the [`hub`].

pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// Re-export entry points
pub use config::Config;
pub use error::ServerError;
pub use ui::{run as run_server, serve};
