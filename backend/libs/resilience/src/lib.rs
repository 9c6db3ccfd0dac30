/// Resilience patterns for background sync jobs
///
/// This library provides:
/// - **Linear backoff**: `attempt * step` delays, bounded by a retry ceiling
/// - **Keyed retry counters**: one counter per job key, reset on success or exhaustion
///
/// # Example: Page retry for a sync job
///
/// ```rust
/// use resilience::{RetryConfig, RetryCounters, RetryDecision};
/// use std::time::Duration;
///
/// let counters = RetryCounters::new(RetryConfig {
///     max_retries: 4,
///     backoff_step: Duration::from_secs(10),
/// });
///
/// match counters.record_failure(&"osu/score") {
///     RetryDecision::Retry { attempt, delay } => {
///         assert_eq!(attempt, 1);
///         assert_eq!(delay, Duration::from_secs(10));
///     }
///     RetryDecision::Exhausted { .. } => unreachable!(),
/// }
/// ```

pub mod retry;

// Re-export main types for convenience
pub use retry::{RetryConfig, RetryCounters, RetryDecision};
