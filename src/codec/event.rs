//! SSE event construction and encoding
//!
//! An [`SseEvent`] is immutable once built. All five fields are optional on
//! the wire; the hub always sets `event`, usually `id`, and sets `retry`
//! only on the initial connect event.

use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;

/// A single server-sent event
///
/// Cheap to build, encoded exactly once per fan-out. Use the consuming
/// `with_*` methods to populate optional fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    /// Event id, echoed back by clients via `Last-Event-ID`
    pub id: Option<String>,
    /// Event name (`event:` field)
    pub event: Option<String>,
    /// JSON payload carried in the `data:` field
    pub data: Option<Value>,
    /// Reconnect hint in milliseconds (`retry:` field)
    pub retry: Option<u64>,
    /// Comment line, useful as a keep-alive no-op
    pub comment: Option<String>,
}

impl SseEvent {
    /// Initial event pushed on a fresh connection
    pub const CONNECT: &'static str = "connect";
    /// Direct message to a single client or user
    pub const MESSAGE: &'static str = "message";
    /// Message to every registered connection
    pub const BROADCAST: &'static str = "broadcast";
    /// Periodic liveness probe
    pub const HEARTBEAT: &'static str = "heartbeat";
    /// Chat/system notification fanned out to a group
    pub const GROUP_MESSAGE: &'static str = "group_message";
    /// Membership change (join/leave/kick/disband) fanned out to a group
    pub const GROUP_MEMBER_CHANGE: &'static str = "group_member_change";

    /// Create an event with the given name
    pub fn named(event: impl Into<String>) -> Self {
        Self {
            id: None,
            event: Some(event.into()),
            data: None,
            retry: None,
            comment: None,
        }
    }

    /// Create a bare comment event (keep-alive)
    pub fn comment_only(comment: impl Into<String>) -> Self {
        Self {
            id: None,
            event: None,
            data: None,
            retry: None,
            comment: Some(comment.into()),
        }
    }

    /// Create a heartbeat event carrying the current wall-clock time
    pub fn heartbeat() -> Self {
        Self::named(Self::HEARTBEAT)
            .with_id(millis_event_id())
            .with_data(Value::String(Utc::now().to_rfc3339()))
    }

    /// Set the event id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the JSON payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set the reconnect hint
    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry.as_millis() as u64);
        self
    }

    /// Set the comment line
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Encode into the `text/event-stream` wire form
    ///
    /// Field order is comment, id, event, retry, data, then the blank line
    /// that terminates the event. Multi-line payloads become one `data:`
    /// line per line, which the format requires for lossless transport.
    pub fn encode(&self) -> Bytes {
        let mut out = String::with_capacity(64);

        if let Some(ref comment) = self.comment {
            for line in comment.split('\n') {
                out.push_str(": ");
                out.push_str(line);
                out.push('\n');
            }
        }
        if let Some(ref id) = self.id {
            out.push_str("id: ");
            out.push_str(id);
            out.push('\n');
        }
        if let Some(ref event) = self.event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        if let Some(retry) = self.retry {
            out.push_str("retry: ");
            out.push_str(&retry.to_string());
            out.push('\n');
        }
        if let Some(ref data) = self.data {
            let serialized = match data {
                // Bare strings go out verbatim, the way the heartbeat and
                // plain-text messages are expected to read on the wire.
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            for line in serialized.split('\n') {
                out.push_str("data: ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push('\n');

        Bytes::from(out)
    }
}

/// Generate an event id from the current epoch milliseconds
pub fn millis_event_id() -> String {
    Utc::now().timestamp_millis().to_string()
}
