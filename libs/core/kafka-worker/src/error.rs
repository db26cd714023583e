//! Worker and processing error types
//!
//! [`WorkerError`] covers the queue side (fetch, commit, publish, config) and
//! carries the fatal [`WorkerError::FetchThresholdExceeded`] terminal value.
//! [`ProcessError`] is what a [`crate::Processor`] reports back to the loop.

use core_config::ConfigError;
use rdkafka::error::KafkaError;
use thiserror::Error;

/// Category of a processing failure, used for logging and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Might have succeeded later (network trouble, 5xx)
    Transient,
    /// Will never succeed (malformed payload, 4xx)
    Permanent,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
        }
    }
}

/// Errors raised by the queue collaborator or the consumer loop
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Kafka client error (client creation, subscription, metadata)
    #[error("Kafka error: {0}")]
    Kafka(#[from] KafkaError),

    /// Fetching the next message failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Committing a message offset failed
    #[error("Commit error: {0}")]
    Commit(String),

    /// Publishing messages to the topic failed
    #[error("Publish error: {0}")]
    Publish(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Too many consecutive fetch failures; the worker gave up
    #[error("Fetch failure threshold reached after {failures} consecutive failures: {last_error}")]
    FetchThresholdExceeded { failures: u32, last_error: String },
}

impl WorkerError {
    pub fn fetch(message: impl Into<String>) -> Self {
        WorkerError::Fetch(message.into())
    }

    pub fn commit(message: impl Into<String>) -> Self {
        WorkerError::Commit(message.into())
    }

    pub fn publish(message: impl Into<String>) -> Self {
        WorkerError::Publish(message.into())
    }

    /// Whether this error terminated the consumer loop abnormally
    pub fn is_fatal(&self) -> bool {
        matches!(self, WorkerError::FetchThresholdExceeded { .. })
    }
}

/// Outcome of a failed [`crate::Processor::process`] call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// Shutdown was requested while the message was being processed
    #[error("Processing canceled")]
    Canceled,

    /// The message could not be processed and will be dropped
    #[error("Processing failed: {message}")]
    Failed {
        message: String,
        category: ErrorCategory,
    },
}

impl ProcessError {
    pub fn transient(message: impl Into<String>) -> Self {
        ProcessError::Failed {
            message: message.into(),
            category: ErrorCategory::Transient,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        ProcessError::Failed {
            message: message.into(),
            category: ErrorCategory::Permanent,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, ProcessError::Canceled)
    }

    /// Metric/log label: `canceled`, `transient` or `permanent`
    pub fn label(&self) -> &'static str {
        match self {
            ProcessError::Canceled => "canceled",
            ProcessError::Failed { category, .. } => category.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_labels() {
        assert_eq!(ProcessError::Canceled.label(), "canceled");
        assert_eq!(ProcessError::transient("503").label(), "transient");
        assert_eq!(ProcessError::permanent("404").label(), "permanent");
        assert!(ProcessError::Canceled.is_canceled());
        assert!(!ProcessError::permanent("bad payload").is_canceled());
    }

    #[test]
    fn test_only_threshold_error_is_fatal() {
        let fatal = WorkerError::FetchThresholdExceeded {
            failures: 4,
            last_error: "broker down".to_string(),
        };
        assert!(fatal.is_fatal());
        assert!(fatal.to_string().contains("4 consecutive failures"));

        assert!(!WorkerError::fetch("timeout").is_fatal());
        assert!(!WorkerError::commit("rebalance").is_fatal());
    }

    #[test]
    fn test_config_error_conversion() {
        let err: WorkerError = ConfigError::MissingEnvVar("KAFKA_POSTBACK_TOPIC".to_string()).into();
        assert!(err.to_string().contains("KAFKA_POSTBACK_TOPIC"));
    }
}
