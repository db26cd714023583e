//! The consume → process → commit loop.
//!
//! This module provides:
//! - `Processor` trait for message handlers
//! - `FetchFailureCounter` for the consecutive fetch-failure threshold
//! - `Worker` running the loop until shutdown or fatal abort

use crate::config::KafkaConfig;
use crate::consumer::{MessageSource, QueueMessage};
use crate::error::{ProcessError, WorkerError};
use crate::metrics::WorkerMetrics;
use crate::shutdown::shutdown_requested;
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Handler for fetched messages.
///
/// The processor receives the shared shutdown signal so in-flight work can
/// stop early; it should return [`ProcessError::Canceled`] when it does.
/// Any other error means the message is dropped: the worker commits it anyway.
///
/// # Example
///
/// ```rust,ignore
/// struct PrintProcessor;
///
/// #[async_trait]
/// impl Processor for PrintProcessor {
///     async fn process(&self, message: &QueueMessage, _shutdown: watch::Receiver<bool>) -> Result<(), ProcessError> {
///         println!("{}", message.payload_lossy());
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "print"
///     }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Processor: Send + Sync {
    /// Process a single message.
    async fn process(
        &self,
        message: &QueueMessage,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), ProcessError>;

    /// Processor name for logs and metric labels.
    fn name(&self) -> &'static str;
}

/// Consecutive fetch failures, compared against a threshold.
///
/// Reset by every successful fetch. Owned by the loop; never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailureCounter {
    count: u32,
    threshold: u32,
}

impl FetchFailureCounter {
    pub fn new(threshold: u32) -> Self {
        Self {
            count: 0,
            threshold: threshold.max(1),
        }
    }

    /// Count a failure. Returns `true` once the threshold is reached.
    pub fn record_failure(&mut self) -> bool {
        self.count = self.count.saturating_add(1);
        self.count >= self.threshold
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

/// What the loop does after handling one message
enum Flow {
    Continue,
    Stop,
}

/// Single-consumer worker: fetch one message, process it, commit it.
///
/// Messages are handled strictly in fetch order with at most one in flight.
/// A message is committed after processing whether it succeeded or failed
/// (at-most-once). The only exception is a processor that reports
/// cancellation: the worker then stops without committing.
pub struct Worker<S, P>
where
    S: MessageSource,
    P: Processor,
{
    source: S,
    processor: P,
    fetch_failure_threshold: u32,
    metrics: WorkerMetrics,
}

impl<S, P> Worker<S, P>
where
    S: MessageSource,
    P: Processor,
{
    pub fn new(source: S, processor: P, config: &KafkaConfig) -> Self {
        let metrics = WorkerMetrics::new(&config.topic, processor.name());
        Self {
            source,
            processor,
            fetch_failure_threshold: config.fetch_failure_threshold,
            metrics,
        }
    }

    /// Run until shutdown is requested or fetching fails too often.
    ///
    /// Returns `Ok(())` after a graceful shutdown and
    /// `Err(WorkerError::FetchThresholdExceeded)` when the worker gives up.
    /// The message source is dropped before this returns in both cases.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!(
            processor = self.processor.name(),
            fetch_failure_threshold = self.fetch_failure_threshold,
            "Starting Kafka worker"
        );

        let result = self.consume(&mut shutdown).await;

        // the queue connection is closed before the outcome is reported
        drop(self);

        match &result {
            Ok(()) => info!("Kafka worker stopped"),
            Err(e) => error!(error = %e, "Kafka worker aborted"),
        }

        result
    }

    async fn consume(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), WorkerError> {
        let mut failures = FetchFailureCounter::new(self.fetch_failure_threshold);

        loop {
            if *shutdown.borrow() {
                info!("Shutdown requested, stopping worker");
                return Ok(());
            }

            let fetched = tokio::select! {
                biased;
                _ = shutdown_requested(shutdown) => {
                    info!("Shutdown requested while waiting for a message");
                    return Ok(());
                }
                result = self.source.fetch_one() => result,
            };

            if *shutdown.borrow() {
                info!("Shutdown requested, leaving fetched message uncommitted");
                return Ok(());
            }

            let message = match fetched {
                Ok(message) => {
                    failures.reset();
                    message
                }
                Err(e) => {
                    self.metrics.fetch_failed();

                    if failures.record_failure() {
                        error!(
                            failures = failures.count(),
                            threshold = failures.threshold(),
                            error = %e,
                            "Fetch failure threshold reached, aborting worker"
                        );
                        return Err(WorkerError::FetchThresholdExceeded {
                            failures: failures.count(),
                            last_error: e.to_string(),
                        });
                    }

                    warn!(
                        failures = failures.count(),
                        threshold = failures.threshold(),
                        error = %e,
                        "Error fetching message, retrying"
                    );
                    continue;
                }
            };

            self.metrics.message_fetched();

            if let Flow::Stop = self.handle(message, shutdown.clone()).await {
                return Ok(());
            }
        }
    }

    async fn handle(&self, message: QueueMessage, shutdown: watch::Receiver<bool>) -> Flow {
        debug!(
            topic = %message.topic,
            partition = message.partition,
            offset = message.offset,
            "Processing message"
        );

        let start = Instant::now();
        let result = self.processor.process(&message, shutdown).await;
        let elapsed = start.elapsed();

        match result {
            Ok(()) => {
                self.metrics.processed("delivered", elapsed);
                info!(
                    offset = message.offset,
                    payload = %message.payload_lossy(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Message processed"
                );
            }
            Err(ProcessError::Canceled) => {
                self.metrics.processed("canceled", elapsed);
                warn!(
                    offset = message.offset,
                    payload = %message.payload_lossy(),
                    "Processing canceled by shutdown, message left uncommitted"
                );
                return Flow::Stop;
            }
            Err(e) => {
                self.metrics.processed(e.label(), elapsed);
                warn!(
                    offset = message.offset,
                    payload = %message.payload_lossy(),
                    error = %e,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Message failed and will be discarded"
                );
            }
        }

        self.commit(&message).await;
        Flow::Continue
    }

    async fn commit(&self, message: &QueueMessage) {
        match self.source.commit(message).await {
            Ok(()) => self.metrics.committed(),
            Err(e) => {
                self.metrics.commit_failed();
                error!(
                    partition = message.partition,
                    offset = message.offset,
                    error = %e,
                    "Failed to commit message offset"
                );
            }
        }
    }
}
