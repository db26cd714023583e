//! Kafka Worker
//!
//! A single-consumer worker that pulls one message at a time from a Kafka
//! topic, hands it to a [`Processor`], and commits the offset once the
//! processor has finished with it, whatever the outcome.
//!
//! ## Features
//!
//! - **Strictly sequential**: one message in flight, prefetch depth of 1
//! - **At-most-once**: a message is committed after processing even when it failed
//! - **Fetch-failure threshold**: consecutive fetch errors abort the worker
//!   with [`WorkerError::FetchThresholdExceeded`] so a supervisor can restart it
//! - **Cooperative shutdown**: a `watch` channel interrupts a blocking fetch
//!   and is handed to the processor for in-flight work
//! - **Prometheus metrics** and librdkafka logs routed through `tracing`
//!
//! ## Example
//!
//! ```ignore
//! use kafka_worker::{KafkaConfig, KafkaConsumer, Worker};
//!
//! let config = KafkaConfig::from_env()?;
//! let Some(consumer) = KafkaConsumer::connect(&config, shutdown_rx.clone()).await? else {
//!     return Ok(()); // shutdown requested while connecting
//! };
//! let worker = Worker::new(consumer, processor, &config);
//! worker.run(shutdown_rx).await?;
//! ```

mod config;
mod consumer;
mod context;
mod error;
pub mod metrics;
mod producer;
mod retry;
mod shutdown;
mod worker;

pub use config::KafkaConfig;
pub use consumer::{KafkaConsumer, MessageSource, QueueMessage};
pub use context::TracingContext;
pub use error::{ErrorCategory, ProcessError, WorkerError};
pub use metrics::{init_metrics, render_metrics, WorkerMetrics};
pub use producer::KafkaProducer;
pub use retry::{retry_with_backoff, RetryConfig};
pub use shutdown::shutdown_requested;
pub use worker::{FetchFailureCounter, Processor, Worker};
