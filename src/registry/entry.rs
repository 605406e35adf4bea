//! Per-connection state stored in the registry

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::sink::EventSink;

/// Transport-level metadata captured at connect time
#[derive(Debug, Clone, Default)]
pub struct ConnectMeta {
    /// HTTP session id, if the transport has one
    pub session_id: Option<String>,
    /// Client `User-Agent` header
    pub user_agent: Option<String>,
    /// Remote peer address
    pub remote_addr: Option<String>,
}

impl ConnectMeta {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session id
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the remote address
    pub fn remote_addr(mut self, remote_addr: impl Into<String>) -> Self {
        self.remote_addr = Some(remote_addr.into());
        self
    }
}

/// Entry for a single live connection
#[derive(Debug)]
pub struct ConnectionEntry {
    /// Connection identity
    pub client_id: String,

    /// User behind the connection
    pub user_id: String,

    /// Transport metadata
    pub meta: ConnectMeta,

    /// Monotonic connect time, for idle arithmetic
    pub connected_at: Instant,

    /// Wall-clock connect time, for introspection
    pub connected_wall: DateTime<Utc>,

    /// Last successful send or accepted heartbeat
    pub last_activity: Instant,

    /// Write half of the connection's stream
    pub(super) sink: EventSink,
}

impl ConnectionEntry {
    pub(super) fn new(client_id: &str, user_id: &str, meta: ConnectMeta, sink: EventSink) -> Self {
        let now = Instant::now();
        Self {
            client_id: client_id.to_string(),
            user_id: user_id.to_string(),
            meta,
            connected_at: now,
            connected_wall: Utc::now(),
            last_activity: now,
            sink,
        }
    }

    /// Record client activity
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// How long the connection has been silent
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Clone out the sink handle
    pub fn sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Take a point-in-time copy for introspection
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            client_id: self.client_id.clone(),
            user_id: self.user_id.clone(),
            session_id: self.meta.session_id.clone(),
            user_agent: self.meta.user_agent.clone(),
            remote_addr: self.meta.remote_addr.clone(),
            connected_at: self.connected_wall,
            idle: self.idle_for(),
        }
    }
}

/// Point-in-time view of a connection, detached from live state
#[derive(Debug, Clone)]
pub struct ConnectionSnapshot {
    pub client_id: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub remote_addr: Option<String>,
    pub connected_at: DateTime<Utc>,
    pub idle: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_snapshot_carries_metadata() {
        let (sink, _stream) = EventSink::channel(1);
        let meta = ConnectMeta::new()
            .session_id("s-1")
            .user_agent("curl/8.0")
            .remote_addr("10.0.0.1:4242");
        let entry = ConnectionEntry::new("c1", "alice", meta, sink);

        let snap = entry.snapshot();
        assert_eq!(snap.client_id, "c1");
        assert_eq!(snap.user_id, "alice");
        assert_eq!(snap.session_id.as_deref(), Some("s-1"));
        assert_eq!(snap.user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(snap.remote_addr.as_deref(), Some("10.0.0.1:4242"));
    }

    #[test]
    fn test_touch_resets_idle() {
        let (sink, _stream) = EventSink::channel(1);
        let mut entry = ConnectionEntry::new("c1", "alice", ConnectMeta::new(), sink);

        std::thread::sleep(Duration::from_millis(5));
        assert!(entry.idle_for() >= Duration::from_millis(5));

        entry.touch();
        assert!(entry.idle_for() < Duration::from_millis(5));
    }
}
