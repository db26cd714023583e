//! librdkafka client context that routes client logs into `tracing`.

use rdkafka::client::ClientContext;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::ConsumerContext;
use rdkafka::error::KafkaError;
use tracing::{debug, error, info, warn};

/// Logging hook shared by the consumer and the producer.
///
/// librdkafka hands us a facility and a formatted line; both land as
/// structured fields on a `tracing` event at the matching level.
#[derive(Debug, Clone, Default)]
pub struct TracingContext {
    client: &'static str,
}

impl TracingContext {
    pub fn new(client: &'static str) -> Self {
        Self { client }
    }
}

impl ClientContext for TracingContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => {
                error!(client = self.client, facility = fac, "{}", log_message)
            }
            RDKafkaLogLevel::Warning => {
                warn!(client = self.client, facility = fac, "{}", log_message)
            }
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
                info!(client = self.client, facility = fac, "{}", log_message)
            }
            RDKafkaLogLevel::Debug => {
                debug!(client = self.client, facility = fac, "{}", log_message)
            }
        }
    }

    fn error(&self, error: KafkaError, reason: &str) {
        error!(client = self.client, error = %error, reason = reason, "Kafka client error");
    }
}

impl ConsumerContext for TracingContext {}
