//! Kafka connection configuration
//!
//! `KafkaConfig` is built once at startup (usually via [`FromEnv`]) and
//! shared read-only by the consumer, the producer and the worker loop.

use core_config::{env_list_required, env_or_default, env_parse_or_default, env_required, ConfigError, FromEnv};

/// Configuration for the Kafka consumer/producer and the consumer loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaConfig {
    /// Broker addresses (`host:port`)
    pub brokers: Vec<String>,

    /// Topic carrying the postback instructions
    pub topic: String,

    /// Consumer group; instances in the same group split the partitions
    pub consumer_group: String,

    /// Attempts to reach the brokers before startup fails
    pub max_connect_attempts: u32,

    /// Minimum bytes the broker should return per fetch
    pub min_fetch_bytes: u32,

    /// Maximum bytes per partition per fetch
    pub max_fetch_bytes: u32,

    /// Consecutive fetch failures that abort the worker
    pub fetch_failure_threshold: u32,
}

impl KafkaConfig {
    /// Messages buffered ahead of consumption. Fixed: one at a time.
    pub const PREFETCH_DEPTH: u32 = 1;

    pub const DEFAULT_CONSUMER_GROUP: &'static str = "postback-delivery";
    pub const DEFAULT_MAX_CONNECT_ATTEMPTS: u32 = 10;
    pub const DEFAULT_FETCH_FAILURE_THRESHOLD: u32 = 4;
    pub const DEFAULT_MIN_FETCH_BYTES: u32 = 1;
    pub const DEFAULT_MAX_FETCH_BYTES: u32 = 12 * 1024;

    /// Create a config with default tuning for the given brokers and topic
    pub fn new(brokers: Vec<String>, topic: impl Into<String>) -> Self {
        Self {
            brokers,
            topic: topic.into(),
            ..Self::default()
        }
    }

    /// Broker list in the `bootstrap.servers` format
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }

    pub fn with_consumer_group(mut self, group: impl Into<String>) -> Self {
        self.consumer_group = group.into();
        self
    }

    pub fn with_max_connect_attempts(mut self, attempts: u32) -> Self {
        self.max_connect_attempts = attempts.max(1);
        self
    }

    pub fn with_fetch_failure_threshold(mut self, threshold: u32) -> Self {
        self.fetch_failure_threshold = threshold.max(1);
        self
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.fetch_failure_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "KAFKA_FETCH_FAILURE_THRESHOLD".to_string(),
                details: "must be at least 1".to_string(),
            });
        }
        if self.max_connect_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "KAFKA_MAX_CONNECT_ATTEMPTS".to_string(),
                details: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

impl FromEnv for KafkaConfig {
    /// Requires `KAFKA_HOSTNAME_PORT` (comma-separated) and `KAFKA_POSTBACK_TOPIC`.
    ///
    /// Optional: `KAFKA_CONSUMER_GROUP`, `KAFKA_MAX_CONNECT_ATTEMPTS`,
    /// `KAFKA_FETCH_FAILURE_THRESHOLD`.
    fn from_env() -> Result<Self, ConfigError> {
        Self {
            brokers: env_list_required("KAFKA_HOSTNAME_PORT")?,
            topic: env_required("KAFKA_POSTBACK_TOPIC")?,
            consumer_group: env_or_default("KAFKA_CONSUMER_GROUP", Self::DEFAULT_CONSUMER_GROUP),
            max_connect_attempts: env_parse_or_default(
                "KAFKA_MAX_CONNECT_ATTEMPTS",
                Self::DEFAULT_MAX_CONNECT_ATTEMPTS,
            )?,
            min_fetch_bytes: Self::DEFAULT_MIN_FETCH_BYTES,
            max_fetch_bytes: Self::DEFAULT_MAX_FETCH_BYTES,
            fetch_failure_threshold: env_parse_or_default(
                "KAFKA_FETCH_FAILURE_THRESHOLD",
                Self::DEFAULT_FETCH_FAILURE_THRESHOLD,
            )?,
        }
        .validate()
    }
}

impl Default for KafkaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: "postback".to_string(),
            consumer_group: Self::DEFAULT_CONSUMER_GROUP.to_string(),
            max_connect_attempts: Self::DEFAULT_MAX_CONNECT_ATTEMPTS,
            min_fetch_bytes: Self::DEFAULT_MIN_FETCH_BYTES,
            max_fetch_bytes: Self::DEFAULT_MAX_FETCH_BYTES,
            fetch_failure_threshold: Self::DEFAULT_FETCH_FAILURE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KafkaConfig::default();
        assert_eq!(config.bootstrap_servers(), "localhost:9092");
        assert_eq!(config.topic, "postback");
        assert_eq!(config.max_connect_attempts, 10);
        assert_eq!(config.fetch_failure_threshold, 4);
        assert_eq!(config.min_fetch_bytes, 1);
        assert_eq!(config.max_fetch_bytes, 12288);
        assert_eq!(KafkaConfig::PREFETCH_DEPTH, 1);
    }

    #[test]
    fn test_from_env_required_only() {
        temp_env::with_vars(
            [
                ("KAFKA_HOSTNAME_PORT", Some("kafka-1:9092,kafka-2:9092")),
                ("KAFKA_POSTBACK_TOPIC", Some("postbacks")),
                ("KAFKA_CONSUMER_GROUP", None),
                ("KAFKA_MAX_CONNECT_ATTEMPTS", None),
                ("KAFKA_FETCH_FAILURE_THRESHOLD", None),
            ],
            || {
                let config = KafkaConfig::from_env().unwrap();
                assert_eq!(config.brokers, vec!["kafka-1:9092", "kafka-2:9092"]);
                assert_eq!(config.bootstrap_servers(), "kafka-1:9092,kafka-2:9092");
                assert_eq!(config.topic, "postbacks");
                assert_eq!(config.consumer_group, "postback-delivery");
                assert_eq!(config.fetch_failure_threshold, 4);
            },
        );
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("KAFKA_HOSTNAME_PORT", Some("kafka:9092")),
                ("KAFKA_POSTBACK_TOPIC", Some("postbacks")),
                ("KAFKA_CONSUMER_GROUP", Some("partition-7")),
                ("KAFKA_MAX_CONNECT_ATTEMPTS", Some("3")),
                ("KAFKA_FETCH_FAILURE_THRESHOLD", Some("2")),
            ],
            || {
                let config = KafkaConfig::from_env().unwrap();
                assert_eq!(config.consumer_group, "partition-7");
                assert_eq!(config.max_connect_attempts, 3);
                assert_eq!(config.fetch_failure_threshold, 2);
            },
        );
    }

    #[test]
    fn test_from_env_missing_topic() {
        temp_env::with_vars(
            [
                ("KAFKA_HOSTNAME_PORT", Some("kafka:9092")),
                ("KAFKA_POSTBACK_TOPIC", None),
                ("KAFKA_CONSUMER_GROUP", None),
            ],
            || {
                let err = KafkaConfig::from_env().unwrap_err();
                assert_eq!(err, ConfigError::MissingEnvVar("KAFKA_POSTBACK_TOPIC".to_string()));
            },
        );
    }

    #[test]
    fn test_from_env_rejects_zero_threshold() {
        temp_env::with_vars(
            [
                ("KAFKA_HOSTNAME_PORT", Some("kafka:9092")),
                ("KAFKA_POSTBACK_TOPIC", Some("postbacks")),
                ("KAFKA_FETCH_FAILURE_THRESHOLD", Some("0")),
            ],
            || {
                assert!(matches!(
                    KafkaConfig::from_env(),
                    Err(ConfigError::InvalidValue { .. })
                ));
            },
        );
    }

    #[test]
    fn test_builder_clamps_to_one() {
        let config = KafkaConfig::new(vec!["k:9092".to_string()], "t")
            .with_consumer_group("g")
            .with_fetch_failure_threshold(0)
            .with_max_connect_attempts(0);
        assert_eq!(config.consumer_group, "g");
        assert_eq!(config.fetch_failure_threshold, 1);
        assert_eq!(config.max_connect_attempts, 1);
    }
}
