//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure for the control plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Statement engine limits.
    pub engine: EngineConfig,

    /// Retry budget for remote calls.
    pub retry: RetryConfig,
}

/// Statement engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logical nesting levels allowed below a web ACL rule's root.
    pub web_acl_max_depth: usize,

    /// Logical nesting levels allowed below a rule group rule's root.
    pub rule_group_max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            web_acl_max_depth: 3,
            rule_group_max_depth: 2,
        }
    }
}

/// Retry configuration for transient remote failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Overall budget for transient service errors, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Overall budget while a delete is blocked by a referencing item, in seconds.
    #[serde(default = "default_associated_item_timeout_secs")]
    pub associated_item_timeout_secs: u64,

    /// First backoff delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Backoff ceiling in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Backoff multiplier between attempts.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

fn default_timeout_secs() -> u64 {
    5 * 60
}

fn default_associated_item_timeout_secs() -> u64 {
    60
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            associated_item_timeout_secs: default_associated_item_timeout_secs(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    /// Get the transient error budget as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the associated item budget as Duration
    pub fn associated_item_timeout(&self) -> Duration {
        Duration::from_secs(self.associated_item_timeout_secs)
    }

    /// Get the first backoff delay as Duration
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    /// Get the backoff ceiling as Duration
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControlPlaneConfig::default();
        assert_eq!(config.engine.web_acl_max_depth, 3);
        assert_eq!(config.engine.rule_group_max_depth, 2);
        assert_eq!(config.retry.timeout(), Duration::from_secs(300));
        assert_eq!(config.retry.associated_item_timeout(), Duration::from_secs(60));
        assert_eq!(config.retry.initial_backoff(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_sections() {
        let config: ControlPlaneConfig = toml::from_str(
            r#"
            [retry]
            timeout_secs = 30
        "#,
        )
        .unwrap();
        assert_eq!(config.retry.timeout_secs, 30);
        assert_eq!(config.retry.max_backoff_ms, 10_000);
        assert_eq!(config.engine, EngineConfig::default());
    }
}
