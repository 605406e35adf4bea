//! Registry configuration

use std::time::Duration;

/// Configuration for the connection registry and liveness monitor
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Per-connection outbound queue depth; a full queue counts as a write
    /// failure and evicts the connection
    pub sink_capacity: usize,

    /// Maximum silence before a connection is presumed dead
    pub liveness_timeout: Duration,

    /// Period of the liveness sweep
    pub sweep_interval: Duration,

    /// Whether the sweep pushes heartbeat events to surviving connections
    pub heartbeat_enabled: bool,

    /// Reconnect hint carried on the initial connect event
    pub connect_retry_hint: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sink_capacity: 64,
            liveness_timeout: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(60),
            heartbeat_enabled: true,
            connect_retry_hint: Duration::from_secs(5),
        }
    }
}

impl RegistryConfig {
    /// Set the per-connection queue depth (minimum 1)
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity.max(1);
        self
    }

    /// Set the liveness timeout
    pub fn liveness_timeout(mut self, timeout: Duration) -> Self {
        self.liveness_timeout = timeout;
        self
    }

    /// Set the sweep period
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Enable or disable sweep heartbeats
    pub fn heartbeat_enabled(mut self, enabled: bool) -> Self {
        self.heartbeat_enabled = enabled;
        self
    }

    /// Set the reconnect hint
    pub fn connect_retry_hint(mut self, hint: Duration) -> Self {
        self.connect_retry_hint = hint;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.sink_capacity, 64);
        assert_eq!(config.liveness_timeout, Duration::from_secs(120));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert!(config.heartbeat_enabled);
        assert_eq!(config.connect_retry_hint, Duration::from_secs(5));
    }

    #[test]
    fn test_sink_capacity_floor() {
        // Capacity 0 would make every send fail; clamp to 1.
        let config = RegistryConfig::default().sink_capacity(0);

        assert_eq!(config.sink_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .sink_capacity(8)
            .liveness_timeout(Duration::from_secs(30))
            .sweep_interval(Duration::from_secs(10))
            .heartbeat_enabled(false)
            .connect_retry_hint(Duration::from_secs(1));

        assert_eq!(config.sink_capacity, 8);
        assert_eq!(config.liveness_timeout, Duration::from_secs(30));
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
        assert!(!config.heartbeat_enabled);
        assert_eq!(config.connect_retry_hint, Duration::from_secs(1));
    }
}
