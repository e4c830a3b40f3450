//! Default implementations for configuration types.
//!
//! This module contains all `Default` implementations and helper functions
//! for providing default values in serde deserialization.

use crate::config::types::{ClassifierConfig, MonitorConfig, RetryConfig};

/// Returns the default permission poll interval in seconds (3).
///
/// Accessibility trust can be granted or revoked at any time from System
/// Settings; 3 seconds keeps the monitor responsive without busy-polling.
///
/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_permission_poll_secs() -> u64 {
    3
}

/// Returns the default fallback window poll interval in seconds (5).
///
/// The poll is a correctness backstop for applications whose event
/// subscription was rejected, and for missed notifications.
///
/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_window_poll_secs() -> u64 {
    5
}

/// Returns the default per-step retry delays in milliseconds.
///
/// Three attempts at 100ms, +400ms, +500ms (cumulative 0.1s / 0.5s / 1.0s)
/// tolerate window-list lag after a destroyed notification without polling
/// aggressively forever.
///
/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_retry_delays_ms() -> Vec<u64> {
    vec![100, 400, 500]
}

/// Returns the default minimum window dimension in points (50).
///
/// Windows smaller than 50x50 are treated as zero-size placeholders some
/// applications leave behind.
///
/// Used by serde `#[serde(default = "...")]` attribute.
pub fn default_min_window_size() -> f64 {
    50.0
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            permission_poll_secs: default_permission_poll_secs(),
            window_poll_secs: default_window_poll_secs(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delays_ms: default_retry_delays_ms(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_width: default_min_window_size(),
            min_height: default_min_window_size(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::AutoquitConfig;

    #[test]
    fn test_monitor_config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.permission_poll_secs, 3);
        assert_eq!(config.window_poll_secs, 5);
    }

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.delays_ms, vec![100, 400, 500]);
        assert_eq!(config.delays_ms.iter().sum::<u64>(), 1000);
    }

    #[test]
    fn test_classifier_config_defaults() {
        let config = ClassifierConfig::default();
        assert_eq!(config.min_width, 50.0);
        assert_eq!(config.min_height, 50.0);
    }

    #[test]
    fn test_empty_toml_matches_defaults() {
        let parsed: AutoquitConfig = toml::from_str("").unwrap();
        let built = AutoquitConfig::default();
        assert_eq!(
            parsed.monitor.permission_poll_secs,
            built.monitor.permission_poll_secs
        );
        assert_eq!(parsed.monitor.window_poll_secs, built.monitor.window_poll_secs);
        assert_eq!(parsed.retry.delays_ms, built.retry.delays_ms);
        assert_eq!(parsed.classifier.min_width, built.classifier.min_width);
    }
}
