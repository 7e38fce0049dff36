//! HTTP API request and response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::Sender;

/// Connection count of one tenant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantStatsDto {
    pub tenant_key: String,
    pub connections: usize,
}

/// Response of `GET /api/hub/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubStatsDto {
    pub total_connections: usize,
    pub tenants: Vec<TenantStatsDto>,
    pub generated_at: String, // ISO 8601
}

/// Body of `POST /api/sessions/{session_id}/messages`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessageRequest {
    pub content: String,
    /// Defaults to `operator`
    #[serde(default)]
    pub sender: Option<Sender>,
}

/// Response of the session endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionActionResponse {
    pub session_id: String,
    pub delivered: bool,
}
