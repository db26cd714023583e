//! Kafka producer used to enqueue postback instructions.
//!
//! Payloads are queued on librdkafka first, then the producer is flushed
//! (a few times if needed) and every delivery report is checked, so a
//! successful return means each message reached the broker.

use crate::config::KafkaConfig;
use crate::context::TracingContext;
use crate::error::WorkerError;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{DeliveryFuture, FutureProducer, FutureRecord, Producer};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Flush attempts before giving up on queued messages
const FLUSH_ATTEMPTS: u32 = 3;

/// Time allowed for each flush attempt
const FLUSH_TIMEOUT: Duration = Duration::from_millis(3000);

/// Producer for the postback topic
pub struct KafkaProducer {
    producer: FutureProducer<TracingContext>,
    topic: String,
}

impl KafkaProducer {
    pub fn new(config: &KafkaConfig) -> Result<Self, WorkerError> {
        info!(
            brokers = %config.bootstrap_servers(),
            topic = %config.topic,
            "Creating Kafka producer"
        );

        let producer: FutureProducer<TracingContext> = ClientConfig::new()
            .set("bootstrap.servers", config.bootstrap_servers())
            .set("acks", "all")
            .set("message.timeout.ms", "10000")
            .create_with_context(TracingContext::new("producer"))?;

        Ok(Self {
            producer,
            topic: config.topic.clone(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish every payload, in order, and wait until all are acknowledged.
    pub async fn publish_all(&self, payloads: &[String]) -> Result<(), WorkerError> {
        let mut deliveries: Vec<DeliveryFuture> = Vec::with_capacity(payloads.len());

        for payload in payloads {
            debug!(topic = %self.topic, payload = %payload, "Queueing message");
            let record: FutureRecord<'_, (), String> = FutureRecord::to(&self.topic).payload(payload);
            let delivery = self
                .producer
                .send_result(record)
                .map_err(|(e, _)| WorkerError::publish(e.to_string()))?;
            deliveries.push(delivery);
        }

        self.flush().await?;

        for delivery in deliveries {
            match delivery.await {
                Ok(Ok(_)) => {}
                Ok(Err((e, _))) => return Err(WorkerError::publish(e.to_string())),
                Err(_) => return Err(WorkerError::publish("delivery report dropped")),
            }
        }

        Ok(())
    }

    async fn flush(&self) -> Result<(), WorkerError> {
        let mut last_error = String::new();

        for attempt in 1..=FLUSH_ATTEMPTS {
            let producer = self.producer.clone();
            // flush blocks the calling thread
            let result = tokio::task::spawn_blocking(move || producer.flush(FLUSH_TIMEOUT))
                .await
                .map_err(|e| WorkerError::publish(format!("flush task failed: {e}")))?;

            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, max_attempts = FLUSH_ATTEMPTS, error = %e, "Flush incomplete");
                    last_error = e.to_string();
                }
            }
        }

        Err(WorkerError::publish(format!(
            "unable to flush after {FLUSH_ATTEMPTS} attempts, messages might be lost: {last_error}"
        )))
    }
}
