//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const fn default_timeout_secs() -> u64 {
    10
}

const fn default_max_retries() -> u32 {
    2
}

const fn default_max_concurrency() -> usize {
    8
}

const fn default_backoff_base_ms() -> u64 {
    250
}

const fn default_backoff_max_ms() -> u64 {
    5_000
}

const fn default_run_deadline_secs() -> u64 {
    120
}

const fn default_max_cooldown_wait_secs() -> u64 {
    5
}

/// Used when a 429 response carries no `Retry-After` header.
const fn default_retry_after_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    concat!("argus/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchConfig {
    /// Per-call timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient failures (timeouts, network errors, 5xx).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Maximum calls in flight.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Whole-run deadline in seconds. `0` disables it.
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,

    /// Longest rate-limit cooldown a call will wait out before failing.
    #[serde(default = "default_max_cooldown_wait_secs")]
    pub max_cooldown_wait_secs: u64,

    #[serde(default = "default_retry_after_secs")]
    pub default_retry_after_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            max_concurrency: default_max_concurrency(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            run_deadline_secs: default_run_deadline_secs(),
            max_cooldown_wait_secs: default_max_cooldown_wait_secs(),
            default_retry_after_secs: default_retry_after_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl DispatchConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid("dispatch.timeout_secs", "must be at least 1"));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::invalid(
                "dispatch.max_concurrency",
                "must be at least 1",
            ));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(ConfigError::invalid(
                "dispatch.backoff_base_ms",
                format!(
                    "{} exceeds backoff_max_ms {}",
                    self.backoff_base_ms, self.backoff_max_ms
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DispatchConfig::default();
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.max_retries, 2);
        assert!(config.user_agent.starts_with("argus/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn inverted_backoff_is_rejected() {
        let config = DispatchConfig {
            backoff_base_ms: 10_000,
            ..DispatchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
