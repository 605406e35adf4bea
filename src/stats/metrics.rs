//! Hub and group statistics

use std::collections::HashMap;
use std::time::Duration;

/// Aggregate group membership statistics
#[derive(Debug, Clone, Default)]
pub struct GroupStatistics {
    /// Number of live groups
    pub total_groups: usize,
    /// Membership edges across all groups
    pub total_members: usize,
    /// Member count per group
    pub per_group_size: HashMap<String, usize>,
}

/// Hub-wide statistics snapshot
#[derive(Debug, Clone, Default)]
pub struct HubStats {
    /// Currently live connections
    pub active_connections: usize,
    /// Connections ever registered
    pub total_connections: u64,
    /// Events successfully handed to a sink
    pub events_delivered: u64,
    /// Sends that failed on a dead or stalled sink
    pub events_failed: u64,
    /// Connections force-evicted (write failure or liveness timeout)
    pub evicted_connections: u64,
    /// Time since the hub was created
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_statistics_default_is_empty() {
        let stats = GroupStatistics::default();

        assert_eq!(stats.total_groups, 0);
        assert_eq!(stats.total_members, 0);
        assert!(stats.per_group_size.is_empty());
    }

    #[test]
    fn test_hub_stats_default() {
        let stats = HubStats::default();

        assert_eq!(stats.active_connections, 0);
        assert_eq!(stats.events_delivered, 0);
        assert_eq!(stats.uptime, Duration::ZERO);
    }
}
