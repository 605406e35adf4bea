//! Liveness monitoring
//!
//! A single periodic task sweeps the registry: connections silent for
//! longer than the configured threshold are evicted (sink completed,
//! registry and membership entries removed), then survivors receive a
//! heartbeat event. A heartbeat that lands refreshes the connection's
//! activity clock; one that fails evicts through the normal write-failure
//! path. No connection's failure can stop the sweep loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::codec::SseEvent;
use crate::dispatch::Dispatcher;
use crate::registry::{CloseReason, ConnectionRegistry, RegistryConfig};

/// Periodic liveness sweep over the connection registry
pub struct LivenessMonitor {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<Dispatcher>,
    config: RegistryConfig,
}

impl LivenessMonitor {
    /// Create a monitor over the given registry and dispatcher
    ///
    /// Threshold and period come from the registry's configuration.
    pub fn new(registry: Arc<ConnectionRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        let config = registry.config().clone();
        Self {
            registry,
            dispatcher,
            config,
        }
    }

    /// Run one sweep; returns the number of connections evicted
    pub async fn sweep(&self) -> usize {
        let stale = self
            .registry
            .idle_clients(self.config.liveness_timeout)
            .await;

        for client_id in &stale {
            tracing::info!(client_id = %client_id, "Liveness timeout, evicting");
            self.dispatcher.evict(client_id, CloseReason::Stale).await;
        }

        if self.config.heartbeat_enabled {
            self.send_heartbeats().await;
        }

        stale.len()
    }

    /// Push a heartbeat to every remaining connection
    ///
    /// A delivered heartbeat counts as activity; a failed one evicts via
    /// the dispatcher's write-failure handling.
    async fn send_heartbeats(&self) -> usize {
        let frame = SseEvent::heartbeat().encode();
        let mut sent = 0;
        for client_id in self.registry.client_ids().await {
            if self.dispatcher.deliver_frame(&client_id, frame.clone()).await {
                sent += 1;
            }
        }
        if sent > 0 {
            tracing::debug!(connections = sent, "Heartbeats sent");
        }
        sent
    }

    /// Spawn the background sweep task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        let period = monitor.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so a fresh hub
            // does not heartbeat connections registered microseconds ago.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = monitor.sweep().await;
                if evicted > 0 {
                    tracing::info!(evicted, "Liveness sweep complete");
                }
            }
        })
    }
}
