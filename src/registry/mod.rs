//! Connection registry
//!
//! The registry owns the mapping of client identity to live streaming sink
//! plus connection metadata. It is the single source of truth for "is this
//! client currently reachable".
//!
//! # Architecture
//!
//! ```text
//!                     Arc<ConnectionRegistry>
//!                ┌────────────────────────────────┐
//!                │ connections: HashMap<ClientId, │
//!                │   ConnectionEntry {            │
//!                │     meta, last_activity,       │
//!                │     sink: mpsc::Sender,        │
//!                │   }                            │
//!                │ >                              │
//!                │ by_user: HashMap<UserId,       │
//!                │   Set<ClientId>>               │
//!                └───────────────┬────────────────┘
//!                                │
//!              ┌─────────────────┼─────────────────┐
//!              ▼                 ▼                 ▼
//!        [Dispatcher]      [LivenessMonitor]  [Transport]
//!        sink(id).send()   idle_clients()     ClientStream::recv()
//! ```
//!
//! Each connection gets its own bounded channel: per-recipient delivery
//! order falls out of the queue, and one slow or dead peer only ever fails
//! its own channel. The encoded event is a `bytes::Bytes`, so fanning one
//! event out to many sinks clones a reference count, not the payload.

pub mod config;
pub mod entry;
pub mod error;
pub mod sink;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{ConnectMeta, ConnectionEntry, ConnectionSnapshot};
pub use error::SinkError;
pub use sink::{ClientStream, CloseReason, EventSink, SinkMessage};
pub use store::ConnectionRegistry;
