//! Connection registry implementation
//!
//! The single source of truth for which clients are currently reachable.
//! Thread-safe via `RwLock`; read-heavy paths (sink lookup during fan-out,
//! introspection) share the outer read lock, while register/remove take the
//! outer write lock, which also serializes create/destroy for the same
//! client id.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use super::config::RegistryConfig;
use super::entry::{ConnectMeta, ConnectionEntry, ConnectionSnapshot};
use super::sink::{ClientStream, CloseReason, EventSink};

/// Central registry for all live connections
pub struct ConnectionRegistry {
    /// Map of client id to connection entry
    connections: RwLock<HashMap<String, Arc<Mutex<ConnectionEntry>>>>,

    /// User id to client ids, for multi-device fan-out
    by_user: RwLock<HashMap<String, HashSet<String>>>,

    /// Configuration
    config: RegistryConfig,

    /// Connections ever registered
    total_registered: AtomicU64,
}

impl ConnectionRegistry {
    /// Create a registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            by_user: RwLock::new(HashMap::new()),
            config,
            total_registered: AtomicU64::new(0),
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a connection, superseding any prior one with the same id
    ///
    /// Last-connect-wins: an existing sink for `client_id` is closed with
    /// `CloseReason::Superseded` (an orderly completion, not an error)
    /// before the new entry is installed. Returns the read half for the
    /// transport layer to drain.
    pub async fn register(
        &self,
        client_id: &str,
        user_id: &str,
        meta: ConnectMeta,
    ) -> ClientStream {
        let (sink, stream) = EventSink::channel(self.config.sink_capacity);
        let entry = ConnectionEntry::new(client_id, user_id, meta, sink);

        let prior_user = {
            let mut connections = self.connections.write().await;

            let prior_user = if let Some(prior) = connections.remove(client_id) {
                let prior = prior.lock().await;
                prior.sink.close(CloseReason::Superseded);
                tracing::info!(
                    client_id = %client_id,
                    user_id = %prior.user_id,
                    "Connection superseded"
                );
                Some(prior.user_id.clone())
            } else {
                None
            };

            connections.insert(client_id.to_string(), Arc::new(Mutex::new(entry)));
            prior_user
        };

        {
            let mut by_user = self.by_user.write().await;
            if let Some(prior_user) = prior_user.filter(|u| u.as_str() != user_id) {
                if let Some(clients) = by_user.get_mut(&prior_user) {
                    clients.remove(client_id);
                    if clients.is_empty() {
                        by_user.remove(&prior_user);
                    }
                }
            }
            by_user
                .entry(user_id.to_string())
                .or_default()
                .insert(client_id.to_string());
        }

        self.total_registered.fetch_add(1, Ordering::Relaxed);
        tracing::info!(client_id = %client_id, user_id = %user_id, "Client connected");

        stream
    }

    /// Clone out the sink for a client, if connected
    pub async fn sink(&self, client_id: &str) -> Option<EventSink> {
        let connections = self.connections.read().await;
        let entry = connections.get(client_id)?;
        let sink = entry.lock().await.sink();
        Some(sink)
    }

    /// Update a client's last-activity timestamp
    pub async fn touch(&self, client_id: &str) -> bool {
        let connections = self.connections.read().await;
        if let Some(entry) = connections.get(client_id) {
            entry.lock().await.touch();
            true
        } else {
            false
        }
    }

    /// Remove a connection, closing its sink with the given reason
    ///
    /// Idempotent: removing an absent client returns `false`. Group
    /// membership is torn down separately (see `Dispatcher::evict`).
    pub async fn remove(&self, client_id: &str, reason: CloseReason) -> bool {
        let removed = {
            let mut connections = self.connections.write().await;
            connections.remove(client_id)
        };

        let Some(entry) = removed else {
            return false;
        };

        let user_id = {
            let entry = entry.lock().await;
            entry.sink.close(reason);
            entry.user_id.clone()
        };

        {
            let mut by_user = self.by_user.write().await;
            if let Some(clients) = by_user.get_mut(&user_id) {
                clients.remove(client_id);
                if clients.is_empty() {
                    by_user.remove(&user_id);
                }
            }
        }

        tracing::info!(client_id = %client_id, reason = %reason, "Connection removed");
        true
    }

    /// Whether a client is currently connected
    pub async fn contains(&self, client_id: &str) -> bool {
        self.connections.read().await.contains_key(client_id)
    }

    /// Number of live connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }

    /// Ids of all live connections
    pub async fn client_ids(&self) -> Vec<String> {
        self.connections.read().await.keys().cloned().collect()
    }

    /// Ids of all connections belonging to a user
    pub async fn clients_of_user(&self, user_id: &str) -> Vec<String> {
        let by_user = self.by_user.read().await;
        by_user
            .get(user_id)
            .map(|clients| clients.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every live connection
    pub async fn snapshot(&self) -> Vec<ConnectionSnapshot> {
        let connections = self.connections.read().await;
        let mut out = Vec::with_capacity(connections.len());
        for entry in connections.values() {
            out.push(entry.lock().await.snapshot());
        }
        out
    }

    /// Snapshot of a single connection
    pub async fn snapshot_one(&self, client_id: &str) -> Option<ConnectionSnapshot> {
        let connections = self.connections.read().await;
        let entry = connections.get(client_id)?;
        let snapshot = entry.lock().await.snapshot();
        Some(snapshot)
    }

    /// Clients whose silence exceeds the given threshold
    pub async fn idle_clients(&self, threshold: Duration) -> Vec<String> {
        let connections = self.connections.read().await;
        let mut stale = Vec::new();
        for (client_id, entry) in connections.iter() {
            // Skip entries busy in a send; they are active by definition.
            if let Ok(entry) = entry.try_lock() {
                if entry.idle_for() > threshold {
                    stale.push(client_id.clone());
                }
            }
        }
        stale
    }

    /// Close every sink with the given reason and clear the registry
    ///
    /// Used at hub shutdown. Returns the number of connections closed.
    pub async fn drain(&self, reason: CloseReason) -> usize {
        let drained = {
            let mut connections = self.connections.write().await;
            std::mem::take(&mut *connections)
        };
        self.by_user.write().await.clear();

        let count = drained.len();
        for entry in drained.values() {
            entry.lock().await.sink.close(reason);
        }

        if count > 0 {
            tracing::info!(connections = count, reason = %reason, "Registry drained");
        }
        count
    }

    /// Connections ever registered
    pub fn total_registered(&self) -> u64 {
        self.total_registered.load(Ordering::Relaxed)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
