//! Configuration management for ratelog.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RatelogError, Result};

/// Main configuration for a rate-limited logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatelogConfig {
    /// Admission strategy
    #[serde(default)]
    pub strategy: Strategy,

    /// Messages admitted per second
    #[serde(default = "default_logs_per_second")]
    pub logs_per_second: u64,

    /// Burst capacity override for the token bucket; defaults to
    /// `logs_per_second`
    #[serde(default)]
    pub burst_capacity: Option<u64>,
}

impl Default for RatelogConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            logs_per_second: default_logs_per_second(),
            burst_capacity: None,
        }
    }
}

fn default_logs_per_second() -> u64 {
    100
}

/// Selectable admission strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Bounded queue drained at a fixed cadence by a background worker
    LeakyBucket,
    /// Exact trailing window over a timestamp log
    SlidingLog,
    /// Two-counter sliding-window approximation
    SlidingWindowCounter,
    /// Refillable token pool with returnable permits
    TokenBucket,
}

impl Default for Strategy {
    fn default() -> Self {
        // The only strategy with no background task and no runtime
        // requirement.
        Strategy::TokenBucket
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Strategy::LeakyBucket => "leaky-bucket",
            Strategy::SlidingLog => "sliding-log",
            Strategy::SlidingWindowCounter => "sliding-window-counter",
            Strategy::TokenBucket => "token-bucket",
        };
        write!(f, "{}", name)
    }
}

impl RatelogConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading logger configuration");

        let contents = std::fs::read_to_string(path)?;
        let config: RatelogConfig = serde_yaml::from_str(&contents)
            .map_err(|e| RatelogError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Reject configurations the limiters cannot run with.
    ///
    /// A zero rate has no drain interval and admits nothing; it is a
    /// configuration mistake, caught here so construction can assume a
    /// positive rate.
    pub fn validate(&self) -> Result<()> {
        if self.logs_per_second == 0 {
            return Err(RatelogError::Config(
                "logs_per_second must be positive".to_string(),
            ));
        }
        if self.burst_capacity == Some(0) {
            return Err(RatelogError::Config(
                "burst_capacity must be positive when set".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RatelogConfig::default();
        assert_eq!(config.strategy, Strategy::TokenBucket);
        assert_eq!(config.logs_per_second, 100);
        assert_eq!(config.burst_capacity, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
strategy: leaky-bucket
logs_per_second: 25
"#;
        let config: RatelogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.strategy, Strategy::LeakyBucket);
        assert_eq!(config.logs_per_second, 25);
    }

    #[test]
    fn test_parse_yaml_with_burst_capacity() {
        let yaml = r#"
strategy: token-bucket
logs_per_second: 10
burst_capacity: 50
"#;
        let config: RatelogConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.burst_capacity, Some(50));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: RatelogConfig = serde_yaml::from_str("strategy: sliding-log").unwrap();
        assert_eq!(config.strategy, Strategy::SlidingLog);
        assert_eq!(config.logs_per_second, 100);
    }

    #[test]
    fn test_zero_rate_fails_validation() {
        let config = RatelogConfig {
            logs_per_second: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RatelogError::Config(_))
        ));
    }

    #[test]
    fn test_zero_burst_capacity_fails_validation() {
        let config = RatelogConfig {
            burst_capacity: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(RatelogError::Config(_))
        ));
    }
}
