//! Configuration type definitions for the AutoQuit monitor.
//!
//! These types are deserialized from the TOML config file. Every field has a
//! serde default so a partial (or absent) config file behaves the same as the
//! built-in defaults.

use serde::{Deserialize, Serialize};

/// Main configuration loaded from `~/.autoquit/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutoquitConfig {
    /// Polling intervals for the two periodic tasks
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Retry schedule for quit checks
    #[serde(default)]
    pub retry: RetryConfig,

    /// Standard-window classifier thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Intervals for the permission poll and the fallback window poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between accessibility-permission checks.
    /// Default: 3 seconds.
    #[serde(default = "super::defaults::default_permission_poll_secs")]
    pub permission_poll_secs: u64,

    /// Seconds between fallback polls of every watched application.
    /// Default: 5 seconds.
    #[serde(default = "super::defaults::default_window_poll_secs")]
    pub window_poll_secs: u64,
}

/// Per-step delays for the bounded quit-check retry schedule.
///
/// Window-destroyed notifications can arrive before the window list reflects
/// the close, so each check attempt is delayed; the number of entries is the
/// number of attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Milliseconds to wait before each check attempt, in order.
    /// Default: [100, 400, 500] (cumulative 0.1s / 0.5s / 1.0s).
    #[serde(default = "super::defaults::default_retry_delays_ms")]
    pub delays_ms: Vec<u64>,
}

/// Size thresholds below which a window is treated as a placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum width in points. Default: 50.
    #[serde(default = "super::defaults::default_min_window_size")]
    pub min_width: f64,

    /// Minimum height in points. Default: 50.
    #[serde(default = "super::defaults::default_min_window_size")]
    pub min_height: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_autoquit_config_serialization() {
        let config = AutoquitConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: AutoquitConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            config.monitor.permission_poll_secs,
            parsed.monitor.permission_poll_secs
        );
        assert_eq!(config.retry.delays_ms, parsed.retry.delays_ms);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AutoquitConfig = toml::from_str(
            r#"
[monitor]
window_poll_secs = 10
"#,
        )
        .unwrap();
        assert_eq!(config.monitor.window_poll_secs, 10);
        assert_eq!(config.monitor.permission_poll_secs, 3);
        assert_eq!(config.retry.delays_ms, vec![100, 400, 500]);
        assert_eq!(config.classifier.min_width, 50.0);
    }

    #[test]
    fn test_retry_config_from_toml() {
        let config: AutoquitConfig = toml::from_str(
            r#"
[retry]
delays_ms = [50, 200]
"#,
        )
        .unwrap();
        assert_eq!(config.retry.delays_ms, vec![50, 200]);
    }
}
