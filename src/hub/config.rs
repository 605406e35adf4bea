//! Hub configuration

use crate::registry::RegistryConfig;

/// Configuration for the hub facade
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Registry and liveness settings
    pub registry: RegistryConfig,

    /// Send a welcome notification to the group on every successful join
    pub welcome_on_join: bool,

    /// Fan membership changes (join/leave/kick/disband) out to the group
    pub notify_membership: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            welcome_on_join: true,
            notify_membership: true,
        }
    }
}

impl HubConfig {
    /// Set the registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Enable or disable welcome notifications
    pub fn welcome_on_join(mut self, enabled: bool) -> Self {
        self.welcome_on_join = enabled;
        self
    }

    /// Enable or disable membership change events
    pub fn notify_membership(mut self, enabled: bool) -> Self {
        self.notify_membership = enabled;
        self
    }
}
