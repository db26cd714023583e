//! Kafka consumer and the `MessageSource` seam used by the worker loop.

use crate::config::KafkaConfig;
use crate::context::TracingContext;
use crate::error::WorkerError;
use crate::retry::{retry_with_backoff, RetryConfig};
use crate::shutdown::shutdown_requested;
use async_trait::async_trait;
use rdkafka::config::{ClientConfig, RDKafkaLogLevel};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::{Message, Offset, TopicPartitionList};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// One fetched message, owned so it can outlive the client's buffer
#[derive(Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
}

impl QueueMessage {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            payload: payload.into(),
        }
    }

    /// Payload as text, with invalid UTF-8 replaced (for logging only)
    pub fn payload_lossy(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

impl fmt::Debug for QueueMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueMessage")
            .field("topic", &self.topic)
            .field("partition", &self.partition)
            .field("offset", &self.offset)
            .field("payload", &self.payload_lossy())
            .finish()
    }
}

/// Queue collaborator consumed by [`crate::Worker`].
///
/// `fetch_one` may block indefinitely; the worker races it against the
/// shutdown signal and drops the future when shutdown wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Wait for the next message
    async fn fetch_one(&self) -> Result<QueueMessage, WorkerError>;

    /// Acknowledge the message, advancing the consumer position past it
    async fn commit(&self, message: &QueueMessage) -> Result<(), WorkerError>;
}

/// rdkafka-backed [`MessageSource`] with manual offset commits.
///
/// Dropping the consumer closes the connection and leaves the group.
pub struct KafkaConsumer {
    consumer: Arc<StreamConsumer<TracingContext>>,
}

impl KafkaConsumer {
    /// Create the consumer, verify the brokers answer, and subscribe.
    ///
    /// Reaching the brokers is retried up to `config.max_connect_attempts`
    /// times, since Kafka can take a few seconds to come up. Returns
    /// `Ok(None)` as soon as shutdown is requested, even mid-attempt.
    pub async fn connect(
        config: &KafkaConfig,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<Option<Self>, WorkerError> {
        info!(
            brokers = %config.bootstrap_servers(),
            topic = %config.topic,
            group = %config.consumer_group,
            "Connecting to Kafka broker(s)"
        );

        let retry = RetryConfig::new(config.max_connect_attempts);
        let consumer = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                info!("Shutdown requested while connecting to Kafka");
                return Ok(None);
            }
            result = retry_with_backoff(|| Self::try_connect(config), &retry) => result?,
        };

        consumer.subscribe(&[config.topic.as_str()])?;

        info!(topic = %config.topic, "Kafka consumer subscribed");

        Ok(Some(Self { consumer }))
    }

    fn client_config(config: &KafkaConfig) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        client_config
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("group.id", &config.consumer_group)
            // Offsets are committed by the worker after each message
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("auto.offset.reset", "earliest")
            .set("fetch.min.bytes", config.min_fetch_bytes.to_string())
            .set("max.partition.fetch.bytes", config.max_fetch_bytes.to_string())
            .set("queued.min.messages", KafkaConfig::PREFETCH_DEPTH.to_string())
            .set_log_level(RDKafkaLogLevel::Info);
        client_config
    }

    async fn try_connect(config: &KafkaConfig) -> Result<Arc<StreamConsumer<TracingContext>>, WorkerError> {
        let consumer: StreamConsumer<TracingContext> = Self::client_config(config)
            .create_with_context(TracingContext::new("consumer"))?;
        let consumer = Arc::new(consumer);

        // Metadata fetch is a blocking librdkafka call
        let metadata_client = Arc::clone(&consumer);
        let topic = config.topic.clone();
        let brokers = tokio::task::spawn_blocking(move || {
            metadata_client
                .fetch_metadata(Some(topic.as_str()), METADATA_TIMEOUT)
                .map(|metadata| metadata.brokers().len())
        })
        .await
        .map_err(|e| WorkerError::fetch(format!("metadata request panicked: {e}")))??;

        info!(brokers, "Kafka brokers reachable");
        Ok(consumer)
    }
}

#[async_trait]
impl MessageSource for KafkaConsumer {
    async fn fetch_one(&self) -> Result<QueueMessage, WorkerError> {
        let message = self
            .consumer
            .recv()
            .await
            .map_err(|e| WorkerError::fetch(e.to_string()))?;

        Ok(QueueMessage {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            payload: message.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    async fn commit(&self, message: &QueueMessage) -> Result<(), WorkerError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = message.topic.clone();
        let partition = message.partition;
        let next_offset = Offset::Offset(message.offset + 1);

        // synchronous commit blocks the calling thread
        tokio::task::spawn_blocking(move || {
            let mut positions = TopicPartitionList::new();
            positions
                .add_partition_offset(&topic, partition, next_offset)
                .map_err(|e| WorkerError::commit(e.to_string()))?;

            consumer
                .commit(&positions, CommitMode::Sync)
                .map_err(|e| WorkerError::commit(e.to_string()))
        })
        .await
        .map_err(|e| WorkerError::commit(format!("commit task failed: {e}")))?
    }
}
