//! SSE wire event codec and notification payloads
//!
//! The codec turns an [`SseEvent`] into the literal byte block pushed onto a
//! client's stream. Encoding happens once per fan-out; the resulting
//! [`bytes::Bytes`] is reference-counted, so delivering the same event to a
//! thousand sinks clones a pointer, not the payload.
//!
//! The wire shape follows the `text/event-stream` format:
//!
//! ```text
//! : keep-alive comment
//! id: 1712899200123
//! event: group_message
//! retry: 5000
//! data: {"id":"...","type":"chat",...}
//!
//! ```
//!
//! Payload DTOs ([`NotificationMessage`], [`GroupEvent`], [`ConnectAck`])
//! serialize to camelCase JSON and ride in the `data:` field.

pub mod event;
pub mod message;

pub use event::{millis_event_id, SseEvent};
pub use message::{ConnectAck, GroupAction, GroupEvent, NotificationMessage, Priority};
