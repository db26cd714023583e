//! Startup retry for broker connections.
//!
//! Brokers often come up a few seconds after the worker, so the initial
//! connection is attempted several times with exponential backoff. This is
//! only used while connecting; message delivery has its own attempt limit.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff settings for [`retry_with_backoff`]
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay
    pub max_delay_ms: u64,

    /// Multiplier applied after each failed attempt
    pub backoff_multiplier: f64,

    /// Randomize each delay to 50-100% of its nominal value
    pub use_jitter: bool,
}

impl RetryConfig {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_initial_delay(mut self, delay_ms: u64) -> Self {
        self.initial_delay_ms = delay_ms;
        self
    }

    pub fn with_max_delay(mut self, delay_ms: u64) -> Self {
        self.max_delay_ms = delay_ms;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Nominal (un-jittered) delay after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> u64 {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        (delay as u64).min(self.max_delay_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 250,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
            use_jitter: true,
        }
    }
}

/// Run `operation` until it succeeds or `config.max_attempts` is used up.
///
/// Returns the last error when every attempt failed.
pub async fn retry_with_backoff<F, Fut, T, E>(mut operation: F, config: &RetryConfig) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retrying");
                }
                return Ok(result);
            }
            Err(e) if attempt >= config.max_attempts => {
                warn!(attempts = attempt, error = %e, "Operation failed, giving up");
                return Err(e);
            }
            Err(e) => {
                let nominal = config.delay_after(attempt);
                let delay = if config.use_jitter {
                    apply_jitter(nominal)
                } else {
                    nominal
                };

                warn!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay,
                    error = %e,
                    "Operation failed, retrying"
                );

                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }
    }
}

/// Scale `delay` by a pseudo-random factor in [0.5, 1.0)
fn apply_jitter(delay: u64) -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let factor = (RandomState::new().hash_one(std::time::SystemTime::now()) % 50) as f64 / 100.0 + 0.5;
    (delay as f64 * factor) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_progression_is_capped() {
        let config = RetryConfig::new(10)
            .with_initial_delay(100)
            .with_max_delay(1_000)
            .without_jitter();

        assert_eq!(config.delay_after(1), 100);
        assert_eq!(config.delay_after(2), 200);
        assert_eq!(config.delay_after(3), 400);
        assert_eq!(config.delay_after(5), 1_000);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..20 {
            let jittered = apply_jitter(1_000);
            assert!((500..1_000).contains(&jittered), "jittered = {jittered}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig::new(5).without_jitter();

        let result: Result<&str, String> = retry_with_backoff(
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("broker not ready".to_string())
                } else {
                    Ok("connected")
                }
            },
            &config,
        )
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig::new(3).without_jitter();

        let result: Result<(), String> = retry_with_backoff(
            || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("attempt {n} refused"))
            },
            &config,
        )
        .await;

        assert_eq!(result.unwrap_err(), "attempt 3 refused");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
