//! Per-source rate-limit cooldowns.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Tracks, per source id, the instant before which the source must not be
/// called again.
#[derive(Debug, Default)]
pub struct CooldownTable {
    until: Mutex<HashMap<String, Instant>>,
}

impl CooldownTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or extend) a cooldown for `source_id`.
    pub fn start(&self, source_id: &str, wait: Duration) {
        let deadline = Instant::now() + wait;
        let mut map = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = map.entry(source_id.to_string()).or_insert(deadline);
        if *entry < deadline {
            *entry = deadline;
        }
    }

    /// Time left on the cooldown, if one is active.
    pub fn remaining(&self, source_id: &str) -> Option<Duration> {
        let now = Instant::now();
        let map = self.until.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(source_id)
            .filter(|until| **until > now)
            .map(|until| *until - now)
    }

    pub fn is_cooling(&self, source_id: &str) -> bool {
        self.remaining(source_id).is_some()
    }
}
