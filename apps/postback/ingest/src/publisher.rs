use async_trait::async_trait;
use kafka_worker::{KafkaProducer, WorkerError};

/// Sink for encoded `METHOD,TARGET` postbacks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostbackPublisher: Send + Sync {
    /// Publish every message; `Ok` only once all of them are accepted
    async fn publish(&self, messages: Vec<String>) -> Result<(), WorkerError>;
}

#[async_trait]
impl PostbackPublisher for KafkaProducer {
    async fn publish(&self, messages: Vec<String>) -> Result<(), WorkerError> {
        self.publish_all(&messages).await
    }
}
