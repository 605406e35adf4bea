//! Statistics and introspection snapshots

pub mod metrics;

pub use metrics::{GroupStatistics, HubStats};
