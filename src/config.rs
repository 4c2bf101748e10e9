//! Coordinator configuration.

use serde::{Deserialize, Serialize};

/// Device policy consulted by the coordinator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// When true, the wifi-p2p role always owns its fixed legacy address
    /// (192.168.49.1/24) and skips dynamic allocation entirely.
    pub wifi_p2p_dedicated_ip: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let config = CoordinatorConfig::default();
        assert!(!config.wifi_p2p_dedicated_ip);
    }

    #[test]
    fn test_parse_from_yaml() {
        let config: CoordinatorConfig =
            serde_yaml::from_str("wifi_p2p_dedicated_ip: true").unwrap();
        assert!(config.wifi_p2p_dedicated_ip);

        let config: CoordinatorConfig = serde_yaml::from_str("{}").unwrap();
        assert!(!config.wifi_p2p_dedicated_ip);
    }
}
