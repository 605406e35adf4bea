//! Hub facade implementation
//!
//! [`SseHub`] is the boundary the transport layer talks to: it owns the
//! registry, the membership store, the dispatcher and the liveness monitor,
//! and wires connection lifecycle to group teardown. The transport turns a
//! [`ClientStream`] into a long-lived streamed response and calls
//! [`SseHub::disconnect`] when that response completes, times out or errors.

use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinHandle;

use crate::codec::{millis_event_id, ConnectAck, GroupEvent, NotificationMessage, SseEvent};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::error::Result;
use crate::group::{GroupInfo, GroupStore};
use crate::hub::config::HubConfig;
use crate::monitor::LivenessMonitor;
use crate::registry::{ClientStream, CloseReason, ConnectMeta, ConnectionRegistry, ConnectionSnapshot};
use crate::stats::{GroupStatistics, HubStats};

/// The event-distribution hub
///
/// One instance per process, constructed at startup and torn down with
/// [`shutdown`](SseHub::shutdown), which completes every live stream.
pub struct SseHub {
    config: HubConfig,
    registry: Arc<ConnectionRegistry>,
    groups: Arc<GroupStore>,
    dispatcher: Arc<Dispatcher>,
    monitor: Arc<LivenessMonitor>,
    monitor_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    started_at: Instant,
}

impl SseHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub with custom configuration
    ///
    /// The liveness monitor is not running yet; call
    /// [`start_monitor`](SseHub::start_monitor).
    pub fn with_config(config: HubConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::with_config(config.registry.clone()));
        let groups = Arc::new(GroupStore::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), Arc::clone(&groups)));
        let monitor = Arc::new(LivenessMonitor::new(
            Arc::clone(&registry),
            Arc::clone(&dispatcher),
        ));

        Self {
            config,
            registry,
            groups,
            dispatcher,
            monitor,
            monitor_handle: std::sync::Mutex::new(None),
            started_at: Instant::now(),
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the group membership store
    pub fn groups(&self) -> &Arc<GroupStore> {
        &self.groups
    }

    /// Spawn the background liveness sweep
    ///
    /// Idempotent: a second call while the task is running is a no-op.
    pub fn start_monitor(&self) {
        let mut handle = self.monitor_handle.lock().expect("monitor handle lock");
        if handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false) {
            return;
        }
        *handle = Some(self.monitor.spawn());
        tracing::info!(
            interval = ?self.config.registry.sweep_interval,
            timeout = ?self.config.registry.liveness_timeout,
            "Liveness monitor started"
        );
    }

    /// Establish a connection for a client
    ///
    /// Re-registering an active client id supersedes the prior stream (it
    /// observes an orderly completion). The new stream starts with a
    /// `connect` event carrying the reconnect hint. `last_event_id` is the
    /// client's replay cursor; replay is not provided, so it is accepted
    /// and ignored.
    pub async fn connect(
        &self,
        client_id: &str,
        user_id: &str,
        meta: ConnectMeta,
        last_event_id: Option<&str>,
    ) -> Result<ClientStream> {
        if let Some(cursor) = last_event_id {
            tracing::debug!(
                client_id = %client_id,
                last_event_id = %cursor,
                "Replay requested but not supported; ignoring"
            );
        }

        let stream = self.registry.register(client_id, user_id, meta).await;

        let ack = ConnectAck::new("connected");
        let event = SseEvent::named(SseEvent::CONNECT)
            .with_id(millis_event_id())
            .with_retry(self.config.registry.connect_retry_hint)
            .with_data(serde_json::to_value(&ack)?);
        if !self.dispatcher.send_to_client(client_id, &event).await {
            tracing::warn!(client_id = %client_id, "Initial connect event not delivered");
        }

        Ok(stream)
    }

    /// Establish a connection and join a group in one step
    pub async fn connect_to_group(
        &self,
        client_id: &str,
        user_id: &str,
        group_id: &str,
        meta: ConnectMeta,
    ) -> Result<ClientStream> {
        let stream = self.connect(client_id, user_id, meta, None).await?;
        self.join_group(client_id, user_id, group_id).await?;
        Ok(stream)
    }

    /// Close a client's connection and detach it from every group
    ///
    /// Equivalent to the teardown triggered by transport-level completion.
    pub async fn disconnect(&self, client_id: &str) -> bool {
        self.dispatcher
            .teardown(client_id, CloseReason::Completed)
            .await
    }

    /// Join a group, creating it on first join
    ///
    /// Returns `Ok(false)` for an already-member client. On success the
    /// group is notified of the join and (configurably) welcomed.
    pub async fn join_group(&self, client_id: &str, user_id: &str, group_id: &str) -> Result<bool> {
        let joined = self.groups.join(client_id, user_id, group_id).await;
        if !joined {
            return Ok(false);
        }

        if self.config.notify_membership {
            let change = GroupEvent::join(client_id, user_id, group_id);
            let event = self.member_change_event(&change)?;
            self.dispatcher.send_to_group(group_id, &event).await;
        }
        if self.config.welcome_on_join {
            let welcome = NotificationMessage::welcome(group_id, user_id);
            self.send_to_group(group_id, &welcome).await?;
        }

        Ok(true)
    }

    /// Leave a group
    ///
    /// Remaining members are notified; an emptied group is deleted.
    pub async fn leave_group(&self, client_id: &str, group_id: &str) -> Result<bool> {
        let left = self.groups.leave(client_id, group_id).await;
        if !left {
            return Ok(false);
        }

        if self.config.notify_membership {
            let change = GroupEvent::leave(client_id, group_id);
            let event = self.member_change_event(&change)?;
            self.dispatcher.send_to_group(group_id, &event).await;
        }

        Ok(true)
    }

    /// Kick a member out of a group
    ///
    /// `operator` must be a group administrator; otherwise nothing changes
    /// and `Ok(false)` is returned. The kicked client is told directly,
    /// since the group fan-out no longer reaches it.
    pub async fn kick(&self, client_id: &str, group_id: &str, operator: &str) -> Result<bool> {
        let kicked = self.groups.kick(client_id, group_id, operator).await;
        if !kicked {
            return Ok(false);
        }

        if self.config.notify_membership {
            let change = GroupEvent::kick(client_id, operator, group_id);
            let event = self.member_change_event(&change)?;
            self.dispatcher.send_to_group(group_id, &event).await;
            self.dispatcher.send_to_client(client_id, &event).await;
        }

        Ok(true)
    }

    /// Disband a group, detaching every member
    ///
    /// Authorized to the creator or any administrator. Members are
    /// notified individually; their connections stay open.
    pub async fn disband_group(&self, group_id: &str, operator: &str) -> Result<bool> {
        let members = self.groups.members(group_id).await;
        let disbanded = self.groups.disband(group_id, operator).await;
        if !disbanded {
            return Ok(false);
        }

        if self.config.notify_membership {
            let change = GroupEvent::disband(operator, group_id);
            let event = self.member_change_event(&change)?;
            for member in members {
                self.dispatcher.send_to_client(&member, &event).await;
            }
        }

        Ok(true)
    }

    /// Grant administrator rights in a group
    pub async fn add_administrator(
        &self,
        group_id: &str,
        user_id: &str,
        operator: &str,
    ) -> bool {
        self.groups
            .add_administrator(group_id, user_id, operator)
            .await
    }

    /// Send a notification to one client
    pub async fn send_to_client(&self, client_id: &str, message: &NotificationMessage) -> Result<bool> {
        let event = self.wrap(SseEvent::MESSAGE, message)?;
        Ok(self.dispatcher.send_to_client(client_id, &event).await)
    }

    /// Send a notification to every device of a user
    pub async fn send_to_user(&self, user_id: &str, message: &NotificationMessage) -> Result<DispatchOutcome> {
        let event = self.wrap(SseEvent::MESSAGE, message)?;
        Ok(self.dispatcher.send_to_user(user_id, &event).await)
    }

    /// Send a notification to every member of a group
    pub async fn send_to_group(&self, group_id: &str, message: &NotificationMessage) -> Result<DispatchOutcome> {
        let event = self.wrap(SseEvent::GROUP_MESSAGE, message)?;
        Ok(self.dispatcher.send_to_group(group_id, &event).await)
    }

    /// Send a high-priority system notification to a group
    pub async fn send_system_to_group(&self, group_id: &str, content: &str) -> Result<DispatchOutcome> {
        let message = NotificationMessage::system(group_id, content);
        self.send_to_group(group_id, &message).await
    }

    /// Broadcast a notification to every registered connection
    pub async fn broadcast(&self, message: &NotificationMessage) -> Result<DispatchOutcome> {
        let event = self.wrap(SseEvent::BROADCAST, message)?;
        Ok(self.dispatcher.broadcast_all(&event).await)
    }

    /// Broadcast a notification to every group
    pub async fn broadcast_groups(&self, message: &NotificationMessage) -> Result<DispatchOutcome> {
        let event = self.wrap(SseEvent::GROUP_MESSAGE, message)?;
        Ok(self.dispatcher.broadcast_groups(&event).await)
    }

    /// Push a raw, pre-built event to one client
    pub async fn send_event_to_client(&self, client_id: &str, event: &SseEvent) -> bool {
        self.dispatcher.send_to_client(client_id, event).await
    }

    /// Ids of all live connections
    pub async fn active_clients(&self) -> Vec<String> {
        self.registry.client_ids().await
    }

    /// Snapshots of all live connections
    pub async fn active_connections(&self) -> Vec<ConnectionSnapshot> {
        self.registry.snapshot().await
    }

    /// Number of live connections
    pub async fn connection_count(&self) -> usize {
        self.registry.len().await
    }

    /// Whether a group currently exists
    pub async fn group_exists(&self, group_id: &str) -> bool {
        self.groups.contains(group_id).await
    }

    /// Copy of a group's metadata
    pub async fn group_info(&self, group_id: &str) -> Option<GroupInfo> {
        self.groups.info(group_id).await
    }

    /// Aggregate group statistics
    pub async fn group_statistics(&self) -> GroupStatistics {
        self.groups.statistics().await
    }

    /// Members of a group that currently have a live connection
    pub async fn online_members(&self, group_id: &str) -> Vec<String> {
        let members = self.groups.members(group_id).await;
        let mut online = Vec::with_capacity(members.len());
        for member in members {
            if self.registry.contains(&member).await {
                online.push(member);
            }
        }
        online
    }

    /// Hub-wide statistics snapshot
    pub async fn stats(&self) -> HubStats {
        HubStats {
            active_connections: self.registry.len().await,
            total_connections: self.registry.total_registered(),
            events_delivered: self.dispatcher.delivered_total(),
            events_failed: self.dispatcher.failed_total(),
            evicted_connections: self.dispatcher.evicted_total(),
            uptime: self.started_at.elapsed(),
        }
    }

    /// Stop the monitor, complete every live stream and clear all state
    pub async fn shutdown(&self) {
        if let Some(handle) = self.monitor_handle.lock().expect("monitor handle lock").take() {
            handle.abort();
        }

        let closed = self.registry.drain(CloseReason::Shutdown).await;
        self.groups.clear().await;

        tracing::info!(connections = closed, "Hub shut down");
    }

    fn wrap(&self, event_name: &str, message: &NotificationMessage) -> Result<SseEvent> {
        Ok(SseEvent::named(event_name)
            .with_id(millis_event_id())
            .with_data(serde_json::to_value(message)?))
    }

    fn member_change_event(&self, change: &GroupEvent) -> Result<SseEvent> {
        Ok(SseEvent::named(SseEvent::GROUP_MEMBER_CHANGE)
            .with_id(millis_event_id())
            .with_data(serde_json::to_value(change)?))
    }
}

impl Default for SseHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::registry::{RegistryConfig, SinkMessage};

    use super::*;

    fn quiet_hub() -> SseHub {
        // Membership chatter off so tests can assert exact stream contents.
        SseHub::with_config(
            HubConfig::default()
                .welcome_on_join(false)
                .notify_membership(false),
        )
    }

    async fn next_text(stream: &mut ClientStream) -> String {
        match stream.recv().await {
            Some(SinkMessage::Event(frame)) => String::from_utf8(frame.to_vec()).unwrap(),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connect_pushes_connect_event_with_retry() {
        let hub = quiet_hub();

        let mut stream = hub
            .connect("c1", "alice", ConnectMeta::new(), None)
            .await
            .unwrap();

        let text = next_text(&mut stream).await;
        assert!(text.contains("event: connect\n"));
        assert!(text.contains("retry: 5000\n"));
        assert!(text.contains("\"message\":\"connected\""));
    }

    #[tokio::test]
    async fn test_connect_ignores_replay_cursor() {
        let hub = quiet_hub();

        let mut stream = hub
            .connect("c1", "alice", ConnectMeta::new(), Some("1712899200000"))
            .await
            .unwrap();

        // Only the connect event arrives; nothing is replayed.
        let text = next_text(&mut stream).await;
        assert!(text.contains("event: connect\n"));
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_reconnect_supersedes_prior_stream() {
        let hub = quiet_hub();

        let mut first = hub.connect("c1", "alice", ConnectMeta::new(), None).await.unwrap();
        let _ = next_text(&mut first).await; // connect event

        let mut second = hub.connect("c1", "alice", ConnectMeta::new(), None).await.unwrap();

        match first.recv().await {
            Some(SinkMessage::Closed(CloseReason::Superseded)) => {}
            other => panic!("unexpected message: {:?}", other),
        }
        let text = next_text(&mut second).await;
        assert!(text.contains("event: connect\n"));
        assert_eq!(hub.connection_count().await, 1);
    }

    #[tokio::test]
    async fn test_connect_to_group_welcomes_and_notifies() {
        let hub = SseHub::new();

        let mut stream = hub
            .connect_to_group("c1", "alice", "g1", ConnectMeta::new())
            .await
            .unwrap();

        assert!(hub.group_exists("g1").await);
        assert_eq!(hub.online_members("g1").await, vec!["c1"]);

        let connect = next_text(&mut stream).await;
        assert!(connect.contains("event: connect\n"));
        let change = next_text(&mut stream).await;
        assert!(change.contains("event: group_member_change\n"));
        assert!(change.contains("\"action\":\"join\""));
        let welcome = next_text(&mut stream).await;
        assert!(welcome.contains("event: group_message\n"));
        assert!(welcome.contains("\"type\":\"welcome\""));
    }

    #[tokio::test]
    async fn test_send_outcome_counts() {
        let hub = quiet_hub();

        let _a = hub.connect("a", "alice", ConnectMeta::new(), None).await.unwrap();
        hub.join_group("a", "alice", "g1").await.unwrap();
        // Offline member.
        hub.groups().join("b", "bob", "g1").await;

        let outcome = hub
            .send_to_group("g1", &NotificationMessage::chat("alice", "g1", "hi", "hello"))
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.offline, 1);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.delivered_any());
    }

    #[tokio::test]
    async fn test_kick_notifies_group_and_target() {
        let hub = SseHub::with_config(HubConfig::default().welcome_on_join(false));

        let mut a = hub.connect("clientA", "userA", ConnectMeta::new(), None).await.unwrap();
        let mut b = hub.connect("clientB", "userB", ConnectMeta::new(), None).await.unwrap();
        hub.join_group("clientA", "userA", "g1").await.unwrap();
        hub.join_group("clientB", "userB", "g1").await.unwrap();

        // Drain everything so far.
        let _ = next_text(&mut a).await; // connect
        let _ = next_text(&mut a).await; // A's join
        let _ = next_text(&mut a).await; // B's join
        let _ = next_text(&mut b).await; // connect
        let _ = next_text(&mut b).await; // B's join

        // Unauthorized kick changes nothing.
        assert!(!hub.kick("clientB", "g1", "userC").await.unwrap());
        assert!(hub.groups().is_member("clientB", "g1").await);

        assert!(hub.kick("clientB", "g1", "userA").await.unwrap());
        assert!(!hub.groups().is_member("clientB", "g1").await);

        let to_group = next_text(&mut a).await;
        assert!(to_group.contains("\"action\":\"kick\""));
        let to_kicked = next_text(&mut b).await;
        assert!(to_kicked.contains("\"action\":\"kick\""));
    }

    #[tokio::test]
    async fn test_disband_notifies_members_and_deletes_group() {
        let hub = SseHub::with_config(
            HubConfig::default().welcome_on_join(false).notify_membership(true),
        );

        let mut a = hub.connect("a", "alice", ConnectMeta::new(), None).await.unwrap();
        hub.join_group("a", "alice", "g1").await.unwrap();
        let _ = next_text(&mut a).await; // connect
        let _ = next_text(&mut a).await; // join

        assert!(hub.disband_group("g1", "alice").await.unwrap());
        assert!(!hub.group_exists("g1").await);
        // Member stays connected and learns about the disband.
        assert_eq!(hub.connection_count().await, 1);
        let text = next_text(&mut a).await;
        assert!(text.contains("\"action\":\"disband\""));
    }

    #[tokio::test]
    async fn test_disconnect_detaches_from_groups() {
        let hub = quiet_hub();

        let mut stream = hub.connect("c1", "alice", ConnectMeta::new(), None).await.unwrap();
        hub.join_group("c1", "alice", "g1").await.unwrap();

        assert!(hub.disconnect("c1").await);
        assert_eq!(hub.connection_count().await, 0);
        assert!(!hub.group_exists("g1").await);

        let _ = next_text(&mut stream).await; // connect
        match stream.recv().await {
            Some(SinkMessage::Closed(CloseReason::Completed)) => {}
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_group_statistics_reflect_membership() {
        let hub = quiet_hub();

        let _a = hub.connect("a", "alice", ConnectMeta::new(), None).await.unwrap();
        let _b = hub.connect("b", "bob", ConnectMeta::new(), None).await.unwrap();
        hub.join_group("a", "alice", "g1").await.unwrap();
        hub.join_group("b", "bob", "g1").await.unwrap();
        hub.join_group("b", "bob", "g2").await.unwrap();

        let stats = hub.group_statistics().await;
        assert_eq!(stats.total_groups, 2);
        assert_eq!(stats.total_members, 3);
        assert_eq!(stats.per_group_size["g1"], 2);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let hub = quiet_hub();

        let _a = hub.connect("a", "alice", ConnectMeta::new(), None).await.unwrap();
        hub.send_to_client("a", &NotificationMessage::new("chat", "bob", "t", "c"))
            .await
            .unwrap();

        let stats = hub.stats().await;
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.total_connections, 1);
        // connect event + message
        assert_eq!(stats.events_delivered, 2);
        assert_eq!(stats.events_failed, 0);
    }

    #[tokio::test]
    async fn test_shutdown_completes_all_streams() {
        let config = HubConfig::default()
            .welcome_on_join(false)
            .notify_membership(false)
            .registry(
                RegistryConfig::default()
                    .sweep_interval(Duration::from_millis(20))
                    .heartbeat_enabled(false),
            );
        let hub = SseHub::with_config(config);
        hub.start_monitor();

        let mut a = hub.connect("a", "alice", ConnectMeta::new(), None).await.unwrap();
        let mut b = hub.connect("b", "bob", ConnectMeta::new(), None).await.unwrap();
        hub.join_group("a", "alice", "g1").await.unwrap();

        hub.shutdown().await;

        assert_eq!(hub.connection_count().await, 0);
        assert!(!hub.group_exists("g1").await);
        for stream in [&mut a, &mut b] {
            let _ = next_text(stream).await; // connect event
            match stream.recv().await {
                Some(SinkMessage::Closed(CloseReason::Shutdown)) => {}
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_send_to_user_multi_device() {
        let hub = quiet_hub();

        let mut phone = hub.connect("phone", "alice", ConnectMeta::new(), None).await.unwrap();
        let mut laptop = hub.connect("laptop", "alice", ConnectMeta::new(), None).await.unwrap();
        let _ = next_text(&mut phone).await;
        let _ = next_text(&mut laptop).await;

        let outcome = hub
            .send_to_user("alice", &NotificationMessage::new("chat", "bob", "t", "c").with_receiver("alice"))
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 2);
        assert!(next_text(&mut phone).await.contains("event: message\n"));
        assert!(next_text(&mut laptop).await.contains("event: message\n"));
    }
}
