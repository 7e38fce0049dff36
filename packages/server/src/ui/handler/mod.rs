//! Handler modules for HTTP and WebSocket endpoints.

pub mod http;
pub mod websocket;

// Re-export HTTP handlers
pub use http::{close_session, health_check, hub_stats, push_message};

// Re-export WebSocket handlers
pub use websocket::websocket_handler;
