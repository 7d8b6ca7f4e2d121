//! Periodic usage monitoring configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

const fn default_enabled() -> bool {
    true
}

const fn default_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

const fn default_alert_threshold() -> u8 {
    80
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitorConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time between samples, humantime syntax (`"5m"`, `"90s"`).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Usage percentage at which an entity is reported as an alert.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u8,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval: default_interval(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = MonitorConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.alert_threshold, 80);
    }
}
