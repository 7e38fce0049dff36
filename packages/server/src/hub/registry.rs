//! Tenant-partitioned registry of live connections.
//!
//! Owned by the hub loop and mutated nowhere else. Each entry holds the only
//! sender of its connection's outbound buffer, so removing an entry is what
//! closes the buffer and ends the connection's write pump.

use std::collections::HashMap;

use axum::extract::ws::Utf8Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::{ConnectionId, SessionId, TenantKey};

use super::connection::ConnectionHandle;

struct ConnectionEntry {
    handle: ConnectionHandle,
    outbound: mpsc::Sender<Utf8Bytes>,
}

/// Result of delivering one payload to one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The buffer was full or already closed; the connection was removed.
    Evicted,
    /// No such connection is registered.
    Missing,
}

/// Result of a tenant broadcast
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered: usize,
    pub evicted: Vec<ConnectionId>,
}

/// tenant key → live connections of that tenant
#[derive(Default)]
pub struct Registry {
    tenants: HashMap<TenantKey, HashMap<ConnectionId, ConnectionEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to its tenant's set.
    ///
    /// Re-inserting an id replaces the previous entry and drops its sender.
    pub fn insert(&mut self, handle: ConnectionHandle, outbound: mpsc::Sender<Utf8Bytes>) {
        self.tenants
            .entry(handle.tenant.clone())
            .or_default()
            .insert(handle.id, ConnectionEntry { handle, outbound });
    }

    /// Remove a connection, dropping its tenant when the set becomes empty.
    ///
    /// Returns `false` if the connection was not registered.
    pub fn remove(&mut self, tenant: &TenantKey, id: ConnectionId) -> bool {
        let Some(connections) = self.tenants.get_mut(tenant) else {
            return false;
        };
        let removed = connections.remove(&id).is_some();
        if connections.is_empty() {
            self.tenants.remove(tenant);
        }
        removed
    }

    pub fn contains(&self, tenant: &TenantKey, id: ConnectionId) -> bool {
        self.tenants
            .get(tenant)
            .is_some_and(|connections| connections.contains_key(&id))
    }

    /// Enqueue a payload for a single connection, evicting it if its buffer
    /// cannot take the payload.
    pub fn send_to(&mut self, tenant: &TenantKey, id: ConnectionId, payload: &Utf8Bytes) -> Delivery {
        let Some(entry) = self.tenants.get(tenant).and_then(|c| c.get(&id)) else {
            return Delivery::Missing;
        };
        if try_enqueue(entry, payload) {
            return Delivery::Delivered;
        }
        self.remove(tenant, id);
        Delivery::Evicted
    }

    /// Enqueue a payload for every connection of a tenant, optionally
    /// skipping one.
    ///
    /// Connections whose buffer is full (or already closed) are collected
    /// during the pass and removed afterwards.
    pub fn broadcast(
        &mut self,
        tenant: &TenantKey,
        payload: &Utf8Bytes,
        except: Option<ConnectionId>,
    ) -> BroadcastOutcome {
        let mut outcome = BroadcastOutcome::default();
        let Some(connections) = self.tenants.get(tenant) else {
            return outcome;
        };

        for (id, entry) in connections {
            if Some(*id) == except {
                continue;
            }
            if try_enqueue(entry, payload) {
                outcome.delivered += 1;
            } else {
                outcome.evicted.push(*id);
            }
        }

        for id in &outcome.evicted {
            self.remove(tenant, *id);
        }
        outcome
    }

    /// First connection (in any tenant) carrying `session_id`.
    pub fn find_session(&self, session_id: &SessionId) -> Option<(TenantKey, ConnectionId)> {
        self.tenants.iter().find_map(|(tenant, connections)| {
            connections
                .values()
                .find(|entry| &entry.handle.session_id == session_id)
                .map(|entry| (tenant.clone(), entry.handle.id))
        })
    }

    /// Total number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.tenants.values().map(HashMap::len).sum()
    }

    /// Number of registered connections of one tenant.
    pub fn tenant_connection_count(&self, tenant: &TenantKey) -> usize {
        self.tenants.get(tenant).map_or(0, HashMap::len)
    }

    /// Connection count per tenant, sorted by tenant key.
    pub fn tenant_counts(&self) -> Vec<(TenantKey, usize)> {
        let mut counts: Vec<_> = self
            .tenants
            .iter()
            .map(|(tenant, connections)| (tenant.clone(), connections.len()))
            .collect();
        counts.sort();
        counts
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

fn try_enqueue(entry: &ConnectionEntry, payload: &Utf8Bytes) -> bool {
    match entry.outbound.try_send(payload.clone()) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                tenant = %entry.handle.tenant,
                session_id = %entry.handle.session_id,
                connection_id = %entry.handle.id,
                "Outbound buffer full, evicting slow consumer"
            );
            false
        }
        Err(TrySendError::Closed(_)) => {
            tracing::debug!(
                tenant = %entry.handle.tenant,
                session_id = %entry.handle.session_id,
                "Outbound buffer already closed, evicting"
            );
            false
        }
    }
}
