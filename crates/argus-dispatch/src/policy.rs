//! Dispatch policy: concurrency, timeouts, retry and cooldown budgets.

use std::time::Duration;

use argus_config::DispatchConfig;

#[derive(Debug, Clone)]
pub struct DispatchPolicy {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retries after the first attempt, for transient failures and waited-out
    /// rate limits.
    pub max_retries: u32,
    pub max_concurrency: usize,
    /// Delay before the first retry; doubles per retry.
    pub backoff_base: Duration,
    /// Backoff is capped here.
    pub backoff_max: Duration,
    /// Candidates not started by then are skipped.
    pub run_deadline: Option<Duration>,
    /// Longest rate-limit cooldown a call will sleep through.
    pub max_cooldown_wait: Duration,
    /// Cooldown used when a 429 carries no `Retry-After`.
    pub default_retry_after: Duration,
}

impl Default for DispatchPolicy {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchPolicy {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            max_retries: config.max_retries,
            max_concurrency: config.max_concurrency.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
            run_deadline: (config.run_deadline_secs > 0)
                .then(|| Duration::from_secs(config.run_deadline_secs)),
            max_cooldown_wait: Duration::from_secs(config.max_cooldown_wait_secs),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }
}

impl DispatchPolicy {
    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    #[must_use]
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.backoff_base
            .checked_mul(factor)
            .map_or(self.backoff_max, |d| d.min(self.backoff_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = DispatchPolicy {
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(700),
            ..DispatchPolicy::default()
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(700));
        assert_eq!(policy.backoff(40), Duration::from_millis(700));
    }

    #[test]
    fn zero_deadline_means_none() {
        let config = DispatchConfig {
            run_deadline_secs: 0,
            ..DispatchConfig::default()
        };
        assert!(DispatchPolicy::from(&config).run_deadline.is_none());
    }
}
