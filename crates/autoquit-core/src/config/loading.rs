//! Configuration loading and validation.
//!
//! Loads the user config from `~/.autoquit/config.toml`, or from an explicit
//! path. A missing default config file is not an error; an explicit path that
//! does not exist is.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::types::AutoquitConfig;
use crate::errors::ConfigError;

/// Load configuration.
///
/// With `path`, loads exactly that file and fails if it is missing or
/// malformed. Without it, loads `~/.autoquit/config.toml` when present and
/// falls back to defaults when not.
///
/// # Errors
///
/// Returns an error if an explicit path is missing, if any file fails to
/// parse, or if the resulting configuration is invalid.
pub fn load(path: Option<&Path>) -> Result<AutoquitConfig, ConfigError> {
    let config = match path {
        Some(explicit) => {
            if !explicit.exists() {
                return Err(ConfigError::ConfigNotFound {
                    path: explicit.display().to_string(),
                });
            }
            load_config_file(explicit)?
        }
        None => match user_config_path() {
            Some(default_path) if default_path.exists() => load_config_file(&default_path)?,
            _ => AutoquitConfig::default(),
        },
    };

    validate_config(&config)?;
    Ok(config)
}

/// Path of the default user configuration file, `~/.autoquit/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".autoquit").join("config.toml"))
}

fn load_config_file(path: &Path) -> Result<AutoquitConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        message: format!("'{}': {}", path.display(), e),
    })
}

/// Reject configurations the monitor cannot run with.
fn validate_config(config: &AutoquitConfig) -> Result<(), ConfigError> {
    if config.monitor.permission_poll_secs == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "monitor.permission_poll_secs must be greater than 0".to_string(),
        });
    }
    if config.monitor.window_poll_secs == 0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "monitor.window_poll_secs must be greater than 0".to_string(),
        });
    }
    if config.retry.delays_ms.is_empty() {
        return Err(ConfigError::InvalidConfiguration {
            message: "retry.delays_ms must contain at least one delay".to_string(),
        });
    }
    if config.classifier.min_width < 0.0 || config.classifier.min_height < 0.0 {
        return Err(ConfigError::InvalidConfiguration {
            message: "classifier thresholds must not be negative".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[monitor]
permission_poll_secs = 7

[retry]
delays_ms = [10, 20]
"#,
        )
        .unwrap();

        let config = load(Some(&path)).unwrap();
        assert_eq!(config.monitor.permission_poll_secs, 7);
        assert_eq!(config.monitor.window_poll_secs, 5);
        assert_eq!(config.retry.delays_ms, vec![10, 20]);
    }

    #[test]
    fn test_load_explicit_path_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "invalid toml [[[").unwrap();

        let result = load(Some(&path));
        assert!(matches!(result, Err(ConfigError::ConfigParseError { .. })));
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[monitor]
window_poll_secs = 0
"#,
        )
        .unwrap();

        let result = load(Some(&path));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_retry_schedule() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[retry]
delays_ms = []
"#,
        )
        .unwrap();

        let result = load(Some(&path));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_negative_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[classifier]
min_width = -1.0
"#,
        )
        .unwrap();

        let result = load(Some(&path));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_user_config_path_shape() {
        if let Some(path) = user_config_path() {
            assert!(path.to_string_lossy().contains(".autoquit"));
            assert!(path.to_string_lossy().ends_with("config.toml"));
        }
    }
}
