//! Server state shared by the handlers.

use std::sync::Arc;

use serde::Deserialize;

use crate::{
    domain::{ChatRepository, TenantResolver},
    hub::{ConnectionSettings, Hub},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub session_id: Option<String>,
}

/// Shared application state
pub struct AppState {
    pub hub: Hub,
    /// Widget key to tenant resolution used at handshake
    pub tenants: Arc<dyn TenantResolver>,
    pub chats: Arc<dyn ChatRepository>,
    /// Applied to every accepted connection
    pub connection_settings: ConnectionSettings,
}
