//! Delivery engine: bounded immediate retries against the postback target.
//!
//! Each attempt is classified as one of:
//!
//! | Result                    | Outcome                | Next step            |
//! |---------------------------|------------------------|----------------------|
//! | status < 300              | `Success`              | return               |
//! | 300 <= status < 500       | `NonRetryableFailure`  | return rejection     |
//! | status >= 500             | `RetryableFailure`     | next attempt         |
//! | timeout / transport error | `RetryableFailure`     | next attempt         |
//! | shutdown requested        | `Canceled`             | return, no retry     |
//!
//! Attempts follow each other without any delay.

use crate::error::{DeliveryError, HttpError};
use crate::http::HttpExecutor;
use crate::instruction::DeliveryInstruction;
use core_config::{env_parse_or_default, ConfigError, FromEnv};
use kafka_worker::shutdown_requested;
use metrics::counter;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Per-delivery limits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Bound on each individual attempt
    pub timeout: Duration,

    /// Total attempts, including the first
    pub max_attempts: u32,
}

impl DeliveryConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self { timeout, max_attempts }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl FromEnv for DeliveryConfig {
    /// Optional: `POSTBACK_TIMEOUT_SECS` (default 10), `POSTBACK_MAX_ATTEMPTS` (default 3)
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs: u64 = env_parse_or_default("POSTBACK_TIMEOUT_SECS", Self::DEFAULT_TIMEOUT_SECS)?;
        let max_attempts: u32 = env_parse_or_default("POSTBACK_MAX_ATTEMPTS", Self::DEFAULT_MAX_ATTEMPTS)?;

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "POSTBACK_TIMEOUT_SECS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "POSTBACK_MAX_ATTEMPTS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }

        Ok(Self::new(Duration::from_secs(timeout_secs), max_attempts))
    }
}

/// Classification of one delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    RetryableFailure,
    NonRetryableFailure,
    Canceled,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptOutcome::Success => "success",
            AttemptOutcome::RetryableFailure => "retryable",
            AttemptOutcome::NonRetryableFailure => "non_retryable",
            AttemptOutcome::Canceled => "canceled",
        }
    }
}

/// Map an HTTP status to an attempt outcome
pub fn classify_status(status: u16) -> AttemptOutcome {
    match status {
        0..=299 => AttemptOutcome::Success,
        300..=499 => AttemptOutcome::NonRetryableFailure,
        _ => AttemptOutcome::RetryableFailure,
    }
}

fn record_attempt(outcome: AttemptOutcome) {
    counter!("postback_delivery_attempts_total", "outcome" => outcome.as_str()).increment(1);
}

/// Delivers instructions through an [`HttpExecutor`]
pub struct DeliveryEngine<H: HttpExecutor> {
    executor: H,
}

impl<H: HttpExecutor> DeliveryEngine<H> {
    pub fn new(executor: H) -> Self {
        Self { executor }
    }

    /// Deliver one instruction; returns the number of attempts used on success.
    ///
    /// The shutdown signal is checked before each attempt and again right
    /// after it, and it interrupts an attempt that is still in flight.
    pub async fn deliver(
        &self,
        instruction: &DeliveryInstruction,
        config: &DeliveryConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<u32, DeliveryError> {
        let max_attempts = config.max_attempts;
        let mut last_failure = String::from("no attempt made");

        for attempt in 1..=max_attempts {
            if *shutdown.borrow() {
                return Err(self.canceled(instruction, attempt, max_attempts));
            }

            info!(attempt, max_attempts, postback = %instruction, "Postback attempt");

            let result = tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => None,
                result = self.executor.execute(&instruction.method, &instruction.target, config.timeout) => Some(result),
            };

            let result = match result {
                Some(result) if !*shutdown.borrow() => result,
                _ => return Err(self.canceled(instruction, attempt, max_attempts)),
            };

            match result {
                Ok(status) => {
                    let outcome = classify_status(status);
                    record_attempt(outcome);

                    match outcome {
                        AttemptOutcome::Success => {
                            info!(attempt, max_attempts, status, postback = %instruction, "Postback delivered");
                            return Ok(attempt);
                        }
                        AttemptOutcome::NonRetryableFailure => {
                            warn!(attempt, max_attempts, status, postback = %instruction, "Postback rejected");
                            return Err(DeliveryError::ClientRejection { status });
                        }
                        _ => {
                            warn!(attempt, max_attempts, status, postback = %instruction, "Unexpected HTTP response");
                            last_failure = format!("HTTP status {status}");
                        }
                    }
                }
                Err(HttpError::InvalidRequest(details)) => {
                    record_attempt(AttemptOutcome::NonRetryableFailure);
                    warn!(attempt, postback = %instruction, error = %details, "Postback request could not be built");
                    return Err(DeliveryError::InvalidRequest(details));
                }
                Err(e) => {
                    record_attempt(AttemptOutcome::RetryableFailure);
                    warn!(attempt, max_attempts, postback = %instruction, error = %e, "Postback error");
                    last_failure = e.to_string();
                }
            }
        }

        Err(DeliveryError::RetriesExhausted {
            attempts: max_attempts,
            last_failure,
        })
    }

    fn canceled(&self, instruction: &DeliveryInstruction, attempt: u32, max_attempts: u32) -> DeliveryError {
        record_attempt(AttemptOutcome::Canceled);
        info!(attempt, max_attempts, postback = %instruction, "Canceling postback");
        DeliveryError::Canceled
    }
}
