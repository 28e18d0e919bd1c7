//! Configuration types for PlainFS
//!
//! This module defines configuration structures used across components.
//! All sections are optional in a config file; missing fields fall back to
//! their defaults.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Root configuration for PlainFS
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Metadata layer configuration
    pub metadata: MetadataConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Metadata layer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Number of marker objects read in parallel during bootstrap
    pub load_concurrency: usize,
    /// How to resolve two markers that claim the same local path
    pub duplicate_policy: DuplicateMappingPolicy,
    /// Length of the pseudorandom segment used for new nested directory prefixes
    pub random_suffix_len: usize,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            load_concurrency: 16,
            duplicate_policy: DuplicateMappingPolicy::default(),
            random_suffix_len: 16,
        }
    }
}

impl MetadataConfig {
    /// Reject values the metadata layer cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.load_concurrency == 0 {
            return Err(Error::configuration("load_concurrency must be at least 1"));
        }
        if self.random_suffix_len == 0 {
            return Err(Error::configuration("random_suffix_len must be at least 1"));
        }
        Ok(())
    }
}

/// Resolution of two marker objects that map the same local path.
///
/// Happens when the same logical directory was written by several replicas.
/// The rejected mapping is never an error; it is logged and dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMappingPolicy {
    /// Keep whichever marker finished loading first
    #[default]
    FirstLoaded,
    /// Keep the lexicographically smallest remote prefix, stable across scans
    LowestRemotePrefix,
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.metadata.validate().is_ok());
        assert_eq!(config.metadata.load_concurrency, 16);
        assert_eq!(
            config.metadata.duplicate_policy,
            DuplicateMappingPolicy::FirstLoaded
        );
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = MetadataConfig {
            load_concurrency: 0,
            ..MetadataConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [metadata]
            duplicate_policy = "lowest_remote_prefix"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.metadata.duplicate_policy,
            DuplicateMappingPolicy::LowestRemotePrefix
        );
        assert_eq!(config.metadata.load_concurrency, 16);
        assert_eq!(config.logging.level, "debug");
    }
}
