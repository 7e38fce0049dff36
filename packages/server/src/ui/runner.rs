//! Server startup.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    domain::{ChatRepository, TenantResolver},
    error::ServerError,
    hub::Hub,
    infrastructure::repository::{InMemoryChatRepository, InMemoryTenantResolver},
};

use super::{
    handler::{close_session, health_check, hub_stats, push_message, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/hub/stats", get(hub_stats))
        .route("/api/sessions/{session_id}/messages", post(push_message))
        .route("/api/sessions/{session_id}", delete(close_session))
        .route("/ws/{widget_key}", get(websocket_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind to the configured address and serve until a shutdown signal arrives.
pub async fn run(config: Config) -> Result<(), ServerError> {
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind { address, source })?;

    serve(listener, config, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: Config, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let tenants = config
        .widgets
        .iter()
        .fold(InMemoryTenantResolver::new(), |resolver, binding| {
            resolver.with_widget(binding.widget_key.clone(), binding.tenant.clone(), binding.enabled)
        });
    if tenants.is_empty() {
        tracing::warn!("No widgets configured, every connection will be rejected");
    }
    let tenants: Arc<dyn TenantResolver> = Arc::new(tenants);
    let chats: Arc<dyn ChatRepository> = Arc::new(InMemoryChatRepository::new());

    let (hub, _hub_task) = Hub::spawn(config.hub_settings(), chats.clone());

    let state = Arc::new(AppState {
        hub,
        tenants,
        chats,
        connection_settings: config.connection_settings(),
    });
    let app = build_router(state);

    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
