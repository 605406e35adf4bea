//! Notification and membership payload types
//!
//! These are the JSON bodies carried in the `data:` field of wire events.
//! Field names serialize to camelCase, matching what browser clients of
//! the HTTP surface expect.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Delivery priority of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A chat or system notification
///
/// `persistent` and `expire_at` are forward-compatible schema: they ride on
/// the wire but no storage layer enforces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    /// Message id
    pub id: String,

    /// Message kind: `chat`, `system`, `welcome`, ...
    #[serde(rename = "type")]
    pub kind: String,

    /// Title shown to the recipient
    pub title: String,

    /// Body text
    pub content: String,

    /// Sending user, or `system`
    pub sender: String,

    /// Target user for direct messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,

    /// Group this message belongs to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,

    /// Structured business payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Free-form extra attributes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<HashMap<String, Value>>,

    /// Delivery priority
    pub priority: Priority,

    /// Whether the message should be persisted (not enforced here)
    pub persistent: bool,

    /// Expiry time (not enforced here)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<DateTime<Utc>>,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl NotificationMessage {
    /// Create a message with the given kind, sender and body
    pub fn new(
        kind: impl Into<String>,
        sender: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            title: title.into(),
            content: content.into(),
            sender: sender.into(),
            receiver: None,
            group_id: None,
            data: None,
            extra: None,
            priority: Priority::Medium,
            persistent: false,
            expire_at: None,
            created_at: Utc::now(),
        }
    }

    /// Create a chat message from a user to a group
    pub fn chat(
        sender: impl Into<String>,
        group_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::new("chat", sender, title, content).with_group(group_id)
    }

    /// Create a high-priority system notification for a group
    pub fn system(group_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new("system", "system", "System notice", content)
            .with_group(group_id)
            .with_priority(Priority::High)
    }

    /// Create the welcome message sent when a user joins a group
    pub fn welcome(group_id: impl Into<String>, user_id: &str) -> Self {
        Self::new(
            "welcome",
            "system",
            "Welcome to the group",
            format!("{} joined the group", user_id),
        )
        .with_group(group_id)
    }

    /// Set the group id
    pub fn with_group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Set the target user
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Set the structured payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Set extra attributes
    pub fn with_extra(mut self, extra: HashMap<String, Value>) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the message persistent with an optional expiry
    pub fn persistent_until(mut self, expire_at: Option<DateTime<Utc>>) -> Self {
        self.persistent = true;
        self.expire_at = expire_at;
        self
    }
}

/// Membership change action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupAction {
    Join,
    Leave,
    Kick,
    Disband,
    Message,
}

/// A group membership change, fanned out to remaining members
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEvent {
    /// Connection the change applies to
    pub client_id: String,

    /// User behind the connection, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Affected group
    pub group_id: String,

    /// What happened
    pub action: GroupAction,

    /// When it happened
    pub timestamp: DateTime<Utc>,

    /// Optional attached data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl GroupEvent {
    fn action(
        client_id: impl Into<String>,
        user_id: Option<String>,
        group_id: impl Into<String>,
        action: GroupAction,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            user_id,
            group_id: group_id.into(),
            action,
            timestamp: Utc::now(),
            payload: None,
        }
    }

    /// A client joined a group
    pub fn join(client_id: impl Into<String>, user_id: &str, group_id: impl Into<String>) -> Self {
        Self::action(client_id, Some(user_id.to_string()), group_id, GroupAction::Join)
    }

    /// A client left a group
    pub fn leave(client_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self::action(client_id, None, group_id, GroupAction::Leave)
    }

    /// A client was kicked by an administrator
    pub fn kick(client_id: impl Into<String>, operator: &str, group_id: impl Into<String>) -> Self {
        Self::action(client_id, Some(operator.to_string()), group_id, GroupAction::Kick)
    }

    /// A group was disbanded by its creator or an administrator
    pub fn disband(operator: &str, group_id: impl Into<String>) -> Self {
        Self::action("", Some(operator.to_string()), group_id, GroupAction::Disband)
    }
}

/// Payload of the initial `connect` event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectAck {
    /// Human-readable status
    pub message: String,
    /// Server time at connect
    pub timestamp: DateTime<Utc>,
}

impl ConnectAck {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}
