//! Engine configuration.

use std::time::Duration;

use serde::Deserialize;

/// Tuning for background writes and loads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts per write before giving up (at least one is always made)
    pub write_retries: u32,

    /// Delay before the first retry; doubles after every failure
    pub retry_backoff_ms: u64,

    /// Upper bound on a single load
    pub load_timeout_ms: u64,

    /// Buffered sync errors per subscriber
    pub error_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            write_retries: 3,
            retry_backoff_ms: 200,
            load_timeout_ms: 10_000,
            error_channel_capacity: 64,
        }
    }
}

impl EngineConfig {
    /// Load timeout as a duration.
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// Backoff before retry number `retry` (0-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(factor))
    }

    /// Attempts per write, never zero.
    pub fn attempts(&self) -> u32 {
        self.write_retries.max(1)
    }
}
