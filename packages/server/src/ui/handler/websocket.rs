//! WebSocket connection handlers.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, Path, Query, State, ws::WebSocketUpgrade},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use futures_util::stream::StreamExt;

use crate::{
    domain::{ValueObjectError, VisitorMetadata},
    hub::Connection,
    ui::state::{AppState, ConnectQuery},
    usecase::{ConnectError, OpenSessionUseCase},
};

/// `GET /ws/{widget_key}?session_id=...`
///
/// Resolves the tenant and opens the visitor's chat before upgrading, so a
/// rejected handshake never creates a connection.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(widget_key): Path<String>,
    Query(query): Query<ConnectQuery>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, StatusCode> {
    let Some(session_id) = query.session_id else {
        tracing::warn!(widget_key = %widget_key, "Connection request without session_id");
        return Err(StatusCode::BAD_REQUEST);
    };

    let metadata = visitor_metadata(&headers, peer);
    let open_session = OpenSessionUseCase::new(state.tenants.clone(), state.chats.clone());

    let handle = match open_session.execute(widget_key.clone(), session_id, metadata).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::warn!(widget_key = %widget_key, error = %e, "Rejecting connection");
            return Err(connect_error_status(&e));
        }
    };

    let settings = state.connection_settings.clone();
    let hub = state.hub.clone();
    let session_id = handle.session_id.clone();

    Ok(ws
        .max_message_size(settings.max_message_size)
        .on_failed_upgrade(move |e| {
            tracing::warn!(session_id = %session_id, error = %e, "WebSocket upgrade failed");
        })
        .on_upgrade(move |socket| async move {
            let (sink, stream) = socket.split();
            Connection::new(handle, settings).run(sink, stream, hub).await;
        }))
}

/// Malformed, unknown and disabled widget keys all answer 404.
fn connect_error_status(error: &ConnectError) -> StatusCode {
    match error {
        ConnectError::InvalidInput(
            ValueObjectError::WidgetKeyEmpty | ValueObjectError::WidgetKeyInvalidFormat(_),
        ) => StatusCode::NOT_FOUND,
        ConnectError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ConnectError::WidgetNotFound(_) | ConnectError::WidgetDisabled(_) => StatusCode::NOT_FOUND,
        ConnectError::ChatStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Visitor details from proxy headers, falling back to the socket peer.
fn visitor_metadata(headers: &HeaderMap, peer: SocketAddr) -> VisitorMetadata {
    let ip = header_str(headers, "x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string());

    // First language tag of `Accept-Language`, without its quality value
    let language = header_str(headers, header::ACCEPT_LANGUAGE)
        .and_then(|value| value.split([',', ';']).next())
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map_or_else(|| VisitorMetadata::default().language, str::to_string);

    VisitorMetadata {
        ip,
        user_agent: header_str(headers, header::USER_AGENT)
            .unwrap_or_default()
            .to_string(),
        language,
    }
}
