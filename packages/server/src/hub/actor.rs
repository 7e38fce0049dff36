//! The hub loop.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use serde_json::json;
use tokio::sync::mpsc;

use crate::{
    domain::{ChatRepository, ConnectionId, TenantKey, Timestamp},
    infrastructure::dto::websocket::{Envelope, InboundKind, OutboundKind},
};

use super::{
    ConnectionHandle, HubCommand, HubSettings, HubStats,
    handler::{self, Outgoing},
    registry::{Delivery, Registry},
};

pub(super) struct HubActor {
    registry: Registry,
    chats: Arc<dyn ChatRepository>,
    settings: HubSettings,
    intake: mpsc::Receiver<HubCommand>,
}

impl HubActor {
    pub(super) fn new(
        settings: HubSettings,
        chats: Arc<dyn ChatRepository>,
        intake: mpsc::Receiver<HubCommand>,
    ) -> Self {
        Self {
            registry: Registry::new(),
            chats,
            settings,
            intake,
        }
    }

    pub(super) async fn run(mut self) {
        tracing::info!("Hub started");
        while let Some(command) = self.intake.recv().await {
            self.handle_command(command).await;
        }
        tracing::info!(
            remaining_connections = self.registry.connection_count(),
            "Hub stopped"
        );
    }

    async fn handle_command(&mut self, command: HubCommand) {
        match command {
            HubCommand::Register { handle, outbound } => self.register(handle, outbound),
            HubCommand::Unregister { handle } => self.unregister(&handle),
            HubCommand::Dispatch { source, envelope } => self.dispatch(source, envelope).await,
            HubCommand::BroadcastToTenant {
                tenant,
                envelope,
                except,
            } => self.broadcast(&tenant, &envelope, except),
            HubCommand::BroadcastToSession {
                session_id,
                envelope,
                reply,
            } => {
                let delivered = match self.registry.find_session(&session_id) {
                    Some((tenant, id)) => self.send_to(&tenant, id, &envelope),
                    None => {
                        tracing::debug!(session_id = %session_id, "No connection for session push");
                        false
                    }
                };
                let _ = reply.send(delivered);
            }
            HubCommand::CloseSession { session_id, reply } => {
                let closed = match self.registry.find_session(&session_id) {
                    Some((tenant, id)) => self.registry.remove(&tenant, id),
                    None => false,
                };
                if closed {
                    tracing::info!(session_id = %session_id, "Connection closed by request");
                }
                let _ = reply.send(closed);
            }
            HubCommand::Stats { reply } => {
                let _ = reply.send(HubStats {
                    total_connections: self.registry.connection_count(),
                    tenants: self.registry.tenant_counts(),
                });
            }
        }
    }

    fn register(&mut self, handle: ConnectionHandle, outbound: mpsc::Sender<Utf8Bytes>) {
        let tenant = handle.tenant.clone();
        let id = handle.id;
        let greeting = Envelope::outbound(
            OutboundKind::ConnectionEstablished,
            json!({
                "session_id": handle.session_id.as_str(),
                "timestamp": Timestamp::now().value(),
            }),
        );

        tracing::info!(tenant = %tenant, session_id = %handle.session_id, connection_id = %id, "Client registered");
        self.registry.insert(handle, outbound);
        self.send_to(&tenant, id, &greeting);
    }

    fn unregister(&mut self, handle: &ConnectionHandle) {
        if self.registry.remove(&handle.tenant, handle.id) {
            tracing::info!(
                tenant = %handle.tenant,
                session_id = %handle.session_id,
                connection_id = %handle.id,
                "Client unregistered"
            );
        }
    }

    async fn dispatch(&mut self, source: ConnectionHandle, envelope: Envelope) {
        // A connection evicted while its messages were queued no longer speaks.
        if !self.registry.contains(&source.tenant, source.id) {
            tracing::debug!(session_id = %source.session_id, msg_type = %envelope.r#type, "Dropping message from unregistered connection");
            return;
        }

        let Some(kind) = InboundKind::parse(&envelope.r#type) else {
            tracing::warn!(session_id = %source.session_id, msg_type = %envelope.r#type, "Unknown message type");
            return;
        };
        tracing::debug!(tenant = %source.tenant, session_id = %source.session_id, kind = ?kind, "Dispatching");

        let outgoing = handler::handle(kind, &source, &envelope, self.chats.as_ref(), &self.settings).await;

        for item in outgoing {
            match item {
                Outgoing::ToSource(envelope) => {
                    self.send_to(&source.tenant, source.id, &envelope);
                }
                Outgoing::ToTenant(envelope) => self.broadcast(&source.tenant, &envelope, None),
                Outgoing::ToTenantExceptSource(envelope) => {
                    self.broadcast(&source.tenant, &envelope, Some(source.id))
                }
            }
        }
    }

    fn send_to(&mut self, tenant: &TenantKey, id: ConnectionId, envelope: &Envelope) -> bool {
        let Some(payload) = encode(envelope) else {
            return false;
        };
        self.registry.send_to(tenant, id, &payload) == Delivery::Delivered
    }

    fn broadcast(&mut self, tenant: &TenantKey, envelope: &Envelope, except: Option<ConnectionId>) {
        let Some(payload) = encode(envelope) else {
            return;
        };
        let outcome = self.registry.broadcast(tenant, &payload, except);
        tracing::debug!(
            tenant = %tenant,
            msg_type = %envelope.r#type,
            delivered = outcome.delivered,
            evicted = outcome.evicted.len(),
            "Broadcast"
        );
    }
}

fn encode(envelope: &Envelope) -> Option<Utf8Bytes> {
    match envelope.to_json() {
        Ok(json) => Some(Utf8Bytes::from(json)),
        Err(e) => {
            tracing::error!(msg_type = %envelope.r#type, error = %e, "Failed to serialize envelope");
            None
        }
    }
}
