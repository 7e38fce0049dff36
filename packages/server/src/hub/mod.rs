//! Real-time connection hub.
//!
//! The hub is a single task that owns the [`Registry`](registry::Registry)
//! and processes one [`HubCommand`] at a time: registration,
//! unregistration, dispatch of inbound envelopes and broadcasts all run in
//! arrival order on that task. Everything else talks to it through the
//! cloneable [`Hub`] handle.

mod actor;
pub mod connection;
pub mod handler;
pub mod registry;

use std::{sync::Arc, time::Duration};

use axum::extract::ws::Utf8Bytes;
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    domain::{ChatRepository, ConnectionId, SessionId, TenantKey},
    infrastructure::dto::websocket::Envelope,
};

pub use connection::{Connection, ConnectionHandle, ConnectionSettings, ConnectionState};

/// Errors returned by [`Hub`] handle methods
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    /// The hub loop has stopped
    #[error("hub is not running")]
    Closed,
}

/// Settings of the hub loop and its handlers
#[derive(Debug, Clone)]
pub struct HubSettings {
    /// Capacity of the hub's command queue
    pub intake_capacity: usize,
    /// Messages sent back on `join_chat`
    pub history_limit: usize,
    pub welcome_message: String,
    /// Upper bound on each chat store call made from the hub loop.
    ///
    /// Store calls run on the hub loop itself, so this is also the longest
    /// a slow store can stall fan-out for every tenant.
    pub store_timeout: Duration,
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            intake_capacity: 1024,
            history_limit: 50,
            welcome_message: "Hello! How can I help you today?".to_string(),
            store_timeout: Duration::from_secs(2),
        }
    }
}

/// Snapshot of registry sizes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    pub total_connections: usize,
    /// Sorted by tenant key
    pub tenants: Vec<(TenantKey, usize)>,
}

impl HubStats {
    pub fn connections_for(&self, tenant: &TenantKey) -> usize {
        self.tenants
            .iter()
            .find(|(key, _)| key == tenant)
            .map_or(0, |(_, count)| *count)
    }
}

pub(crate) enum HubCommand {
    Register {
        handle: ConnectionHandle,
        outbound: mpsc::Sender<Utf8Bytes>,
    },
    Unregister {
        handle: ConnectionHandle,
    },
    Dispatch {
        source: ConnectionHandle,
        envelope: Envelope,
    },
    BroadcastToTenant {
        tenant: TenantKey,
        envelope: Envelope,
        except: Option<ConnectionId>,
    },
    BroadcastToSession {
        session_id: SessionId,
        envelope: Envelope,
        reply: oneshot::Sender<bool>,
    },
    CloseSession {
        session_id: SessionId,
        reply: oneshot::Sender<bool>,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
}

/// Handle to the hub loop
///
/// Cloning is cheap. The loop stops once every handle is dropped.
#[derive(Clone)]
pub struct Hub {
    commands: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Start the hub loop on the current runtime.
    pub fn spawn(settings: HubSettings, chats: Arc<dyn ChatRepository>) -> (Self, JoinHandle<()>) {
        let (commands, intake) = mpsc::channel(settings.intake_capacity.max(1));
        let task = tokio::spawn(actor::HubActor::new(settings, chats, intake).run());
        (Self { commands }, task)
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands.send(command).await.map_err(|_| HubError::Closed)
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> HubCommand) -> Result<T, HubError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply)).await?;
        response.await.map_err(|_| HubError::Closed)
    }

    /// Add a connection to its tenant. The hub greets it with
    /// `connection_established`.
    pub async fn register(
        &self,
        handle: ConnectionHandle,
        outbound: mpsc::Sender<Utf8Bytes>,
    ) -> Result<(), HubError> {
        self.send(HubCommand::Register { handle, outbound }).await
    }

    /// Remove a connection and close its outbound buffer. Idempotent.
    pub async fn unregister(&self, handle: ConnectionHandle) -> Result<(), HubError> {
        self.send(HubCommand::Unregister { handle }).await
    }

    /// Hand a stamped inbound envelope to the message handlers.
    pub async fn dispatch(&self, source: ConnectionHandle, envelope: Envelope) -> Result<(), HubError> {
        self.send(HubCommand::Dispatch { source, envelope }).await
    }

    /// Deliver to every connection of a tenant.
    pub async fn broadcast_to_tenant(&self, tenant: TenantKey, envelope: Envelope) -> Result<(), HubError> {
        self.send(HubCommand::BroadcastToTenant {
            tenant,
            envelope,
            except: None,
        })
        .await
    }

    /// Deliver to every connection of a tenant except `exclude`.
    pub async fn broadcast_to_tenant_except(
        &self,
        tenant: TenantKey,
        envelope: Envelope,
        exclude: ConnectionId,
    ) -> Result<(), HubError> {
        self.send(HubCommand::BroadcastToTenant {
            tenant,
            envelope,
            except: Some(exclude),
        })
        .await
    }

    /// Deliver to the first connection carrying `session_id`.
    ///
    /// Returns whether a connection took the message.
    pub async fn broadcast_to_session(&self, session_id: SessionId, envelope: Envelope) -> Result<bool, HubError> {
        self.request(|reply| HubCommand::BroadcastToSession {
            session_id,
            envelope,
            reply,
        })
        .await
    }

    /// Close the first connection carrying `session_id`.
    ///
    /// Returns whether a connection was found.
    pub async fn close_session(&self, session_id: SessionId) -> Result<bool, HubError> {
        self.request(|reply| HubCommand::CloseSession { session_id, reply })
            .await
    }

    pub async fn stats(&self) -> Result<HubStats, HubError> {
        self.request(|reply| HubCommand::Stats { reply }).await
    }
}
