use skyprune_core::{CoreError, ErrorExt, RetrySettings};
use std::time::Duration;

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts per post, first try included
    pub max_attempts: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: f64,
    /// Maximum jitter factor (0.0 to 1.0); 0.0 keeps the schedule exact
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.0,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            initial_delay: Duration::from_secs(settings.initial_delay_secs),
            backoff_multiplier: settings.backoff_multiplier,
            jitter_factor: settings.jitter_factor,
        }
    }
}

/// Retry strategy based on error type
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStrategy {
    /// Back off and try again
    Retry,
    /// Rate limited and out of attempts
    GiveUpRateLimited,
    /// Don't retry (anything that is not a rate limit)
    NoRetry,
}

/// Decide what to do after `attempt` (1-based) failed with `error`.
pub fn get_retry_strategy(error: &CoreError, attempt: u32, config: &RetryConfig) -> RetryStrategy {
    if !error.is_rate_limited() {
        return RetryStrategy::NoRetry;
    }
    if attempt < config.max_attempts {
        RetryStrategy::Retry
    } else {
        RetryStrategy::GiveUpRateLimited
    }
}

/// Longest single backoff sleep.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

/// Delay to sleep after failed attempt `attempt` (1-based): the initial
/// delay multiplied once per earlier retry, plus optional jitter, capped at
/// `MAX_RETRY_DELAY`.
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let base = config.initial_delay.as_secs_f64() * config.backoff_multiplier.powi(exponent);
    let delay = Duration::try_from_secs_f64(base)
        .unwrap_or(MAX_RETRY_DELAY)
        .min(MAX_RETRY_DELAY);

    if config.jitter_factor.is_nan() || config.jitter_factor <= 0.0 {
        return delay;
    }

    let jitter_range = (delay.as_millis() as f64 * config.jitter_factor.min(1.0)) as u64;
    delay
        .saturating_add(Duration::from_millis(fastrand::u64(0..=jitter_range)))
        .min(MAX_RETRY_DELAY)
}
