//! Configuration for the rate limiter.
//!
//! Construction is the only place defaults are applied and parameters are
//! validated. Once built, a [`RateLimiterConfig`] is immutable and safe to
//! share across concurrent checks.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{FloodgateError, Result};

fn default_namespace() -> String {
    "rate-limiter-".to_string()
}

fn default_store_blocked() -> bool {
    true
}

/// Options accepted when building a [`RateLimiterConfig`].
///
/// This is the caller-facing construction surface: fill in the fields (or
/// deserialize them from YAML) and pass the value to
/// [`RateLimiterConfig::new`], which validates and freezes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimiterOptions {
    /// Prefix for all store keys written by this limiter
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Window length in milliseconds
    pub interval_millis: u64,

    /// Maximum admitted actions per window (inclusive ceiling)
    pub max_in_interval: u64,

    /// Minimum spacing between consecutive actions in milliseconds,
    /// if any
    #[serde(default)]
    pub min_difference_millis: Option<u64>,

    /// Whether rejected checks still record a timestamp
    #[serde(default = "default_store_blocked")]
    pub store_blocked: bool,
}

/// Validated, immutable rate limiter parameters.
///
/// All checks issued through one limiter share a single config value.
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    namespace: String,
    interval_millis: u64,
    max_in_interval: u64,
    min_difference_millis: Option<u64>,
    store_blocked: bool,
}

impl RateLimiterConfig {
    /// Validate the given options and build an immutable config.
    ///
    /// Fails fast on a zero window length or a zero action ceiling, so an
    /// invalid configuration can never reach the check path.
    pub fn new(options: RateLimiterOptions) -> Result<Self> {
        if options.interval_millis == 0 {
            return Err(FloodgateError::Config(
                "interval_millis must be greater than 0".to_string(),
            ));
        }
        if options.max_in_interval == 0 {
            return Err(FloodgateError::Config(
                "max_in_interval must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            namespace: options.namespace,
            interval_millis: options.interval_millis,
            max_in_interval: options.max_in_interval,
            min_difference_millis: options.min_difference_millis,
            store_blocked: options.store_blocked,
        })
    }

    /// Load and validate a configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load and validate a configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let options: RateLimiterOptions = serde_yaml::from_str(yaml)
            .map_err(|e| FloodgateError::Config(format!("Failed to parse configuration: {}", e)))?;
        Self::new(options)
    }

    /// Prefix for all store keys written by this limiter.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Window length in milliseconds.
    pub fn interval_millis(&self) -> u64 {
        self.interval_millis
    }

    /// Maximum admitted actions per window.
    pub fn max_in_interval(&self) -> u64 {
        self.max_in_interval
    }

    /// Minimum spacing between consecutive actions in milliseconds, if any.
    pub fn min_difference_millis(&self) -> Option<u64> {
        self.min_difference_millis
    }

    /// Whether rejected checks still record a timestamp.
    pub fn store_blocked(&self) -> bool {
        self.store_blocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> RateLimiterOptions {
        RateLimiterOptions {
            namespace: default_namespace(),
            interval_millis: 10_000,
            max_in_interval: 2,
            min_difference_millis: None,
            store_blocked: default_store_blocked(),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = RateLimiterConfig::new(base_options()).unwrap();

        assert_eq!(config.namespace(), "rate-limiter-");
        assert_eq!(config.interval_millis(), 10_000);
        assert_eq!(config.max_in_interval(), 2);
        assert_eq!(config.min_difference_millis(), None);
        assert!(config.store_blocked());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut options = base_options();
        options.interval_millis = 0;

        let result = RateLimiterConfig::new(options);
        assert!(matches!(result, Err(FloodgateError::Config(_))));
    }

    #[test]
    fn test_zero_max_in_interval_rejected() {
        let mut options = base_options();
        options.max_in_interval = 0;

        let result = RateLimiterConfig::new(options);
        assert!(matches!(result, Err(FloodgateError::Config(_))));
    }

    #[test]
    fn test_from_yaml_applies_defaults() {
        let yaml = r#"
interval_millis: 5000
max_in_interval: 10
"#;
        let config = RateLimiterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.namespace(), "rate-limiter-");
        assert_eq!(config.interval_millis(), 5000);
        assert_eq!(config.max_in_interval(), 10);
        assert_eq!(config.min_difference_millis(), None);
        assert!(config.store_blocked());
    }

    #[test]
    fn test_from_yaml_full() {
        let yaml = r#"
namespace: "login-"
interval_millis: 60000
max_in_interval: 5
min_difference_millis: 2000
store_blocked: false
"#;
        let config = RateLimiterConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.namespace(), "login-");
        assert_eq!(config.min_difference_millis(), Some(2000));
        assert!(!config.store_blocked());
    }

    #[test]
    fn test_from_yaml_invalid_values_rejected() {
        let yaml = r#"
interval_millis: 0
max_in_interval: 10
"#;
        let result = RateLimiterConfig::from_yaml(yaml);
        assert!(matches!(result, Err(FloodgateError::Config(_))));
    }
}
