//! Postback processor for the Kafka worker.
//!
//! Decodes each message as a [`DeliveryInstruction`] and hands it to the
//! [`DeliveryEngine`]. Every outcome is logged with the instruction and the
//! elapsed time; the worker commits the message afterwards either way.

use crate::delivery::{DeliveryConfig, DeliveryEngine};
use crate::error::DeliveryError;
use crate::http::HttpExecutor;
use crate::instruction::DeliveryInstruction;
use async_trait::async_trait;
use kafka_worker::{ProcessError, Processor, QueueMessage};
use std::time::Instant;
use tokio::sync::watch;
use tracing::{info, warn};

pub struct PostbackProcessor<H: HttpExecutor> {
    engine: DeliveryEngine<H>,
    config: DeliveryConfig,
}

impl<H: HttpExecutor> PostbackProcessor<H> {
    pub fn new(executor: H, config: DeliveryConfig) -> Self {
        Self {
            engine: DeliveryEngine::new(executor),
            config,
        }
    }
}

#[async_trait]
impl<H: HttpExecutor + 'static> Processor for PostbackProcessor<H> {
    async fn process(&self, message: &QueueMessage, shutdown: watch::Receiver<bool>) -> Result<(), ProcessError> {
        let start = Instant::now();

        let instruction = match DeliveryInstruction::from_payload(&message.payload) {
            Ok(instruction) => instruction,
            Err(e) => {
                warn!(offset = message.offset, payload = %message.payload_lossy(), error = %e, "Discarding malformed postback");
                return Err(ProcessError::permanent(e.to_string()));
            }
        };

        let result = self.engine.deliver(&instruction, &self.config, shutdown).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(attempts) => {
                info!(postback = %instruction, attempts, elapsed_ms, "Postback complete");
                Ok(())
            }
            Err(DeliveryError::Canceled) => {
                info!(postback = %instruction, elapsed_ms, "Postback canceled");
                Err(ProcessError::Canceled)
            }
            Err(e) => {
                warn!(postback = %instruction, elapsed_ms, error = %e, "Postback failed, discarding");
                if e.is_transient() {
                    Err(ProcessError::transient(e.to_string()))
                } else {
                    Err(ProcessError::permanent(e.to_string()))
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "postback"
    }
}
