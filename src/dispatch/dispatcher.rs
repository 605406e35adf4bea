//! Fan-out dispatcher implementation
//!
//! Every fan-out resolves its recipient set to a snapshot first and never
//! holds a registry or membership lock across a send. The event is encoded
//! once; each recipient gets a reference-counted clone of the bytes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::codec::SseEvent;
use crate::group::GroupStore;
use crate::registry::{CloseReason, ConnectionRegistry};

/// Result of a fan-out call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Recipients the event was handed to
    pub delivered: usize,
    /// Recipients whose sink failed (now evicted)
    pub failed: usize,
    /// Resolved recipients with no live sink (silently skipped)
    pub offline: usize,
}

impl DispatchOutcome {
    /// Whether at least one recipient got the event
    pub fn delivered_any(&self) -> bool {
        self.delivered > 0
    }

    /// Fold another outcome into this one
    pub fn absorb(&mut self, other: DispatchOutcome) {
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.offline += other.offline;
    }
}

/// Per-recipient delivery result
enum Delivery {
    Delivered,
    Offline,
    Failed,
}

/// Resolves targets and pushes events to live sinks
pub struct Dispatcher {
    registry: Arc<ConnectionRegistry>,
    groups: Arc<GroupStore>,
    delivered: AtomicU64,
    failed: AtomicU64,
    evicted: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher over the given stores
    pub fn new(registry: Arc<ConnectionRegistry>, groups: Arc<GroupStore>) -> Self {
        Self {
            registry,
            groups,
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    /// Send an event to one client
    ///
    /// Returns `false` when the client has no live sink or the write
    /// failed; a failed write evicts the connection.
    pub async fn send_to_client(&self, client_id: &str, event: &SseEvent) -> bool {
        let frame = event.encode();
        matches!(self.deliver(client_id, frame).await, Delivery::Delivered)
    }

    /// Send an event to every device of a user
    pub async fn send_to_user(&self, user_id: &str, event: &SseEvent) -> DispatchOutcome {
        let clients = self.registry.clients_of_user(user_id).await;
        self.fan_out(&clients, event).await
    }

    /// Send an event to every member of a group
    ///
    /// Members without a live sink are offline, not an error.
    pub async fn send_to_group(&self, group_id: &str, event: &SseEvent) -> DispatchOutcome {
        let members: Vec<String> = self.groups.members(group_id).await.into_iter().collect();
        let outcome = self.fan_out(&members, event).await;
        tracing::debug!(
            group = %group_id,
            delivered = outcome.delivered,
            failed = outcome.failed,
            offline = outcome.offline,
            "Group fan-out"
        );
        outcome
    }

    /// Send an event to every group
    pub async fn broadcast_groups(&self, event: &SseEvent) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for group_id in self.groups.group_ids().await {
            outcome.absorb(self.send_to_group(&group_id, event).await);
        }
        outcome
    }

    /// Send an event to every registered connection
    ///
    /// Iterates a snapshot: connections arriving mid-broadcast are a
    /// best-effort miss, not an error.
    pub async fn broadcast_all(&self, event: &SseEvent) -> DispatchOutcome {
        let clients = self.registry.client_ids().await;
        self.fan_out(&clients, event).await
    }

    /// Tear a connection down: close the sink, drop registry and
    /// membership state
    ///
    /// Both steps are idempotent; calling this for an unknown client is a
    /// no-op returning `false`.
    pub async fn evict(&self, client_id: &str, reason: CloseReason) -> bool {
        let removed = self.teardown(client_id, reason).await;
        if removed {
            self.evicted.fetch_add(1, Ordering::Relaxed);
        }
        removed
    }

    /// Same teardown without counting it as an eviction (voluntary
    /// disconnect)
    pub async fn teardown(&self, client_id: &str, reason: CloseReason) -> bool {
        let removed = self.registry.remove(client_id, reason).await;
        let left = self.groups.detach_client(client_id).await;
        if removed {
            tracing::info!(
                client_id = %client_id,
                reason = %reason,
                groups_left = left.len(),
                "Connection torn down"
            );
        }
        removed
    }

    /// Push one pre-encoded frame to one client
    pub(crate) async fn deliver_frame(&self, client_id: &str, frame: Bytes) -> bool {
        matches!(self.deliver(client_id, frame).await, Delivery::Delivered)
    }

    /// Events successfully handed to a sink
    pub fn delivered_total(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Sends that failed on a dead or stalled sink
    pub fn failed_total(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Connections force-evicted
    pub fn evicted_total(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    async fn fan_out(&self, clients: &[String], event: &SseEvent) -> DispatchOutcome {
        let frame = event.encode();
        let mut outcome = DispatchOutcome::default();
        for client_id in clients {
            match self.deliver(client_id, frame.clone()).await {
                Delivery::Delivered => outcome.delivered += 1,
                Delivery::Offline => outcome.offline += 1,
                Delivery::Failed => outcome.failed += 1,
            }
        }
        outcome
    }

    async fn deliver(&self, client_id: &str, frame: Bytes) -> Delivery {
        let Some(sink) = self.registry.sink(client_id).await else {
            tracing::debug!(client_id = %client_id, "Recipient not connected");
            return Delivery::Offline;
        };

        match sink.send(frame) {
            Ok(()) => {
                self.registry.touch(client_id).await;
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Delivery::Delivered
            }
            Err(err) => {
                tracing::warn!(
                    client_id = %client_id,
                    error = %err,
                    "Send failed, evicting connection"
                );
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.evict(client_id, CloseReason::Completed).await;
                Delivery::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::registry::{ConnectMeta, RegistryConfig, SinkMessage};

    use super::*;

    fn setup(config: RegistryConfig) -> (Arc<ConnectionRegistry>, Arc<GroupStore>, Dispatcher) {
        let registry = Arc::new(ConnectionRegistry::with_config(config));
        let groups = Arc::new(GroupStore::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&groups));
        (registry, groups, dispatcher)
    }

    fn event() -> SseEvent {
        SseEvent::named("message").with_data(json!({"k": "v"}))
    }

    #[tokio::test]
    async fn test_send_to_client_delivers() {
        let (registry, _groups, dispatcher) = setup(RegistryConfig::default());
        let mut stream = registry.register("c1", "alice", ConnectMeta::new()).await;

        assert!(dispatcher.send_to_client("c1", &event()).await);

        match stream.recv().await {
            Some(SinkMessage::Event(frame)) => {
                let text = std::str::from_utf8(&frame).unwrap();
                assert!(text.starts_with("event: message\n"));
            }
            other => panic!("unexpected message: {:?}", other),
        }
        assert_eq!(dispatcher.delivered_total(), 1);
    }

    #[tokio::test]
    async fn test_send_to_absent_client_is_false_not_error() {
        let (_registry, _groups, dispatcher) = setup(RegistryConfig::default());

        assert!(!dispatcher.send_to_client("ghost", &event()).await);
        assert_eq!(dispatcher.failed_total(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_evicts() {
        let (registry, groups, dispatcher) = setup(RegistryConfig::default());
        let stream = registry.register("c1", "alice", ConnectMeta::new()).await;
        groups.join("c1", "alice", "g1").await;
        drop(stream); // peer gone

        assert!(!dispatcher.send_to_client("c1", &event()).await);

        assert!(!registry.contains("c1").await);
        assert!(!groups.contains("g1").await);
        assert_eq!(dispatcher.failed_total(), 1);
        assert_eq!(dispatcher.evicted_total(), 1);
    }

    #[tokio::test]
    async fn test_group_fan_out_isolates_failures() {
        let (registry, groups, dispatcher) = setup(RegistryConfig::default());

        let mut stream_a = registry.register("a", "alice", ConnectMeta::new()).await;
        let stream_b = registry.register("b", "bob", ConnectMeta::new()).await;
        groups.join("a", "alice", "g1").await;
        groups.join("b", "bob", "g1").await;
        drop(stream_b); // b's sink will fail

        let outcome = dispatcher.send_to_group("g1", &event()).await;

        assert_eq!(outcome, DispatchOutcome { delivered: 1, failed: 1, offline: 0 });
        assert!(matches!(stream_a.recv().await, Some(SinkMessage::Event(_))));
        assert!(!registry.contains("b").await);
        assert!(!groups.is_member("b", "g1").await);
    }

    #[tokio::test]
    async fn test_offline_group_members_are_skipped() {
        let (registry, groups, dispatcher) = setup(RegistryConfig::default());

        let _stream = registry.register("a", "alice", ConnectMeta::new()).await;
        groups.join("a", "alice", "g1").await;
        // b joined the group but never connected.
        groups.join("b", "bob", "g1").await;

        let outcome = dispatcher.send_to_group("g1", &event()).await;

        assert_eq!(outcome, DispatchOutcome { delivered: 1, failed: 0, offline: 1 });
        // b is still a member; offline is not an error.
        assert!(groups.is_member("b", "g1").await);
    }

    #[tokio::test]
    async fn test_backpressure_counts_as_failure() {
        let (registry, _groups, dispatcher) = setup(RegistryConfig::default().sink_capacity(1));

        let _stream = registry.register("c1", "alice", ConnectMeta::new()).await;

        assert!(dispatcher.send_to_client("c1", &event()).await);
        // Queue full, stream never drained: second send fails and evicts.
        assert!(!dispatcher.send_to_client("c1", &event()).await);
        assert!(!registry.contains("c1").await);
    }

    #[tokio::test]
    async fn test_send_to_user_reaches_all_devices() {
        let (registry, _groups, dispatcher) = setup(RegistryConfig::default());

        let mut phone = registry.register("phone", "alice", ConnectMeta::new()).await;
        let mut laptop = registry.register("laptop", "alice", ConnectMeta::new()).await;

        let outcome = dispatcher.send_to_user("alice", &event()).await;

        assert_eq!(outcome.delivered, 2);
        assert!(matches!(phone.recv().await, Some(SinkMessage::Event(_))));
        assert!(matches!(laptop.recv().await, Some(SinkMessage::Event(_))));
    }

    #[tokio::test]
    async fn test_per_recipient_ordering() {
        let (registry, _groups, dispatcher) = setup(RegistryConfig::default());
        let mut stream = registry.register("c1", "alice", ConnectMeta::new()).await;

        for i in 0..3 {
            let ev = SseEvent::named("message").with_id(i.to_string());
            assert!(dispatcher.send_to_client("c1", &ev).await);
        }

        for i in 0..3 {
            match stream.recv().await {
                Some(SinkMessage::Event(frame)) => {
                    let text = std::str::from_utf8(&frame).unwrap();
                    assert!(text.contains(&format!("id: {}\n", i)));
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_broadcast_all_hits_every_connection() {
        let (registry, _groups, dispatcher) = setup(RegistryConfig::default());

        let _s1 = registry.register("c1", "alice", ConnectMeta::new()).await;
        let _s2 = registry.register("c2", "bob", ConnectMeta::new()).await;

        let outcome = dispatcher.broadcast_all(&event()).await;

        assert_eq!(outcome.delivered, 2);
    }

    #[tokio::test]
    async fn test_broadcast_groups_covers_each_group() {
        let (registry, groups, dispatcher) = setup(RegistryConfig::default());

        let _s1 = registry.register("c1", "alice", ConnectMeta::new()).await;
        let _s2 = registry.register("c2", "bob", ConnectMeta::new()).await;
        groups.join("c1", "alice", "g1").await;
        groups.join("c2", "bob", "g2").await;

        let outcome = dispatcher.broadcast_groups(&event()).await;

        assert_eq!(outcome.delivered, 2);
    }

    #[tokio::test]
    async fn test_teardown_does_not_count_as_eviction() {
        let (registry, _groups, dispatcher) = setup(RegistryConfig::default());
        let _stream = registry.register("c1", "alice", ConnectMeta::new()).await;

        assert!(dispatcher.teardown("c1", CloseReason::Completed).await);
        assert_eq!(dispatcher.evicted_total(), 0);

        // Idempotent.
        assert!(!dispatcher.teardown("c1", CloseReason::Completed).await);
    }
}
