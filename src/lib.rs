//! # sse-hub
//!
//! An in-process event-distribution hub for Server-Sent Events: long-lived
//! client streams, named groups, and best-effort fan-out with per-recipient
//! failure isolation.
//!
//! The crate is transport-agnostic. An HTTP layer calls
//! [`SseHub::connect`] to obtain a [`ClientStream`], writes every received
//! block to a `text/event-stream` response, and calls
//! [`SseHub::disconnect`] when the response completes, times out or errors.
//!
//! ```text
//!        HTTP transport                     SseHub
//!   ┌────────────────────┐      ┌───────────────────────────┐
//!   │ GET /sse/connect ──┼────► │ ConnectionRegistry        │
//!   │   stream.recv() ◄──┼───── │   client → sink, metadata │
//!   │ POST /sse/send  ───┼────► │ GroupStore                │
//!   │ POST /group/join ──┼────► │   group ↔ clients, admins │
//!   └────────────────────┘      │ Dispatcher                │
//!                               │   fan-out, evict-on-fail  │
//!                               │ LivenessMonitor           │
//!                               │   sweep + heartbeats      │
//!                               └───────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sse_hub::{ConnectMeta, NotificationMessage, SseHub};
//!
//! # async fn run() -> sse_hub::Result<()> {
//! let hub = SseHub::new();
//! hub.start_monitor();
//!
//! let mut stream = hub.connect("client-1", "alice", ConnectMeta::new(), None).await?;
//! hub.join_group("client-1", "alice", "ops").await?;
//!
//! let outcome = hub
//!     .send_to_group("ops", &NotificationMessage::chat("alice", "ops", "hi", "hello"))
//!     .await?;
//! assert!(outcome.delivered_any());
//!
//! while let Some(frame) = stream.next_event().await {
//!     // write `frame` to the response body
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Delivery is best-effort: no durability, no replay, no cross-process
//! fan-out. A recipient with no live stream is skipped; a recipient whose
//! stream has died is evicted and the fan-out continues.

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod group;
pub mod hub;
pub mod monitor;
pub mod registry;
pub mod stats;

pub use codec::{ConnectAck, GroupAction, GroupEvent, NotificationMessage, Priority, SseEvent};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use error::{HubError, Result};
pub use group::{GroupInfo, GroupStore};
pub use hub::{HubConfig, SseHub};
pub use monitor::LivenessMonitor;
pub use registry::{
    ClientStream, CloseReason, ConnectMeta, ConnectionRegistry, ConnectionSnapshot, EventSink,
    RegistryConfig, SinkError, SinkMessage,
};
pub use stats::{GroupStatistics, HubStats};
