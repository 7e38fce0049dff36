//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chatelly_shared::time::{current_unix_timestamp, timestamp_to_rfc3339};

use crate::{
    domain::Sender,
    infrastructure::dto::http::{
        HubStatsDto, PushMessageRequest, SessionActionResponse, TenantStatsDto,
    },
    ui::state::AppState,
    usecase::{CloseSessionUseCase, PushMessageUseCase, SessionActionError},
};

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Connection counts, overall and per tenant
pub async fn hub_stats(State(state): State<Arc<AppState>>) -> Result<Json<HubStatsDto>, StatusCode> {
    let stats = state.hub.stats().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to read hub stats");
        StatusCode::SERVICE_UNAVAILABLE
    })?;

    Ok(Json(HubStatsDto {
        total_connections: stats.total_connections,
        tenants: stats
            .tenants
            .into_iter()
            .map(|(tenant, connections)| TenantStatsDto {
                tenant_key: tenant.into_string(),
                connections,
            })
            .collect(),
        generated_at: timestamp_to_rfc3339(current_unix_timestamp()),
    }))
}

/// Push a `message_received` envelope to one visitor session
pub async fn push_message(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<PushMessageRequest>,
) -> Result<Json<SessionActionResponse>, StatusCode> {
    let usecase = PushMessageUseCase::new(state.hub.clone());
    let sender = request.sender.unwrap_or(Sender::Operator);

    usecase
        .execute(session_id.clone(), request.content, sender)
        .await
        .map_err(|e| session_error_status(&session_id, &e))?;

    Ok(Json(SessionActionResponse {
        session_id,
        delivered: true,
    }))
}

/// Close a visitor session's connection
pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionActionResponse>, StatusCode> {
    let usecase = CloseSessionUseCase::new(state.hub.clone());

    usecase
        .execute(session_id.clone())
        .await
        .map_err(|e| session_error_status(&session_id, &e))?;

    tracing::info!(session_id = %session_id, "Session closed via API");
    Ok(Json(SessionActionResponse {
        session_id,
        delivered: true,
    }))
}

fn session_error_status(session_id: &str, error: &SessionActionError) -> StatusCode {
    match error {
        SessionActionError::InvalidInput(_) => {
            tracing::warn!(session_id = %session_id, error = %error, "Invalid session request");
            StatusCode::BAD_REQUEST
        }
        SessionActionError::SessionNotConnected(_) => {
            tracing::debug!(session_id = %session_id, "Session not connected");
            StatusCode::NOT_FOUND
        }
        SessionActionError::Hub(_) => {
            tracing::error!(session_id = %session_id, error = %error, "Hub unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
