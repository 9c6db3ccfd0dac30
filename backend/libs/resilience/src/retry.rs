//! Retry policy with linear backoff and per-key attempt counters
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the initial failure
    pub max_retries: u32,
    /// Backoff unit; attempt `n` waits `n * backoff_step`
    pub backoff_step: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_step: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Delay before retry attempt `attempt` (1-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

/// What the caller should do after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep `delay`, then retry. `attempt` is 1-based.
    Retry { attempt: u32, delay: Duration },
    /// Ceiling reached; the counter has been reset to zero.
    Exhausted { attempts: u32 },
}

/// Retry counters keyed by job identity.
///
/// Counters live in `[0, max_retries]`: a failure increments the key's
/// counter until the ceiling, at which point the key is reset and the caller
/// is told to give up. `reset` is called on success.
#[derive(Debug)]
pub struct RetryCounters<K> {
    config: RetryConfig,
    counters: Mutex<HashMap<K, u32>>,
}

impl<K> RetryCounters<K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Current attempt count for `key` (0 when never failed or reset)
    pub fn attempts(&self, key: &K) -> u32 {
        self.counters.lock().get(key).copied().unwrap_or(0)
    }

    /// Register a failure for `key` and decide whether to retry
    pub fn record_failure(&self, key: &K) -> RetryDecision {
        let mut counters = self.counters.lock();
        let counter = counters.entry(key.clone()).or_insert(0);

        if *counter < self.config.max_retries {
            *counter += 1;
            RetryDecision::Retry {
                attempt: *counter,
                delay: self.config.backoff_for(*counter),
            }
        } else {
            let attempts = *counter;
            counters.remove(key);
            debug!(key = ?key, attempts, "Retry ceiling reached, counter reset");
            RetryDecision::Exhausted { attempts }
        }
    }

    /// Clear the counter for `key` after a successful attempt
    pub fn reset(&self, key: &K) {
        self.counters.lock().remove(key);
    }
}
