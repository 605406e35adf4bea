//! Event dispatch
//!
//! The dispatcher resolves a target (client, user, group, or everyone) to
//! concrete sinks and pushes one encoded event to each, with per-recipient
//! failure isolation: a dead peer is evicted and the fan-out continues.

pub mod dispatcher;

pub use dispatcher::{DispatchOutcome, Dispatcher};
