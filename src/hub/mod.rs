//! Hub facade
//!
//! The boundary the transport layer talks to: connect/disconnect, send to
//! client/user/group, group management and introspection. Everything else
//! in the crate hangs off an [`SseHub`].

pub mod config;
pub mod core;

pub use config::HubConfig;
pub use core::SseHub;
