//! Postback Domain
//!
//! Everything about a postback between the ingest API and the target server.
//!
//! # Architecture
//!
//! ```text
//! ingest:  PostbackRequest ─► PostbackTemplate ─► DeliveryInstruction ─► "METHOD,TARGET" ─► topic
//!
//! deliver: topic ─► PostbackProcessor ─► DeliveryInstruction::parse
//!                                     └► DeliveryEngine ─► HttpExecutor (reqwest)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_postback::{DeliveryConfig, PostbackProcessor, ReqwestExecutor};
//! use kafka_worker::{KafkaConfig, KafkaConsumer, Worker};
//!
//! let processor = PostbackProcessor::new(ReqwestExecutor::new()?, DeliveryConfig::from_env()?);
//! if let Some(consumer) = KafkaConsumer::connect(&kafka_config, shutdown_rx.clone()).await? {
//!     Worker::new(consumer, processor, &kafka_config).run(shutdown_rx).await?;
//! }
//! ```

pub mod delivery;
pub mod error;
pub mod http;
pub mod instruction;
pub mod models;
pub mod processor;
pub mod template;

pub use delivery::{classify_status, AttemptOutcome, DeliveryConfig, DeliveryEngine};
pub use error::{DeliveryError, HttpError, ParseError, TemplateError};
pub use http::{HttpExecutor, ReqwestExecutor};
pub use instruction::DeliveryInstruction;
pub use models::{Endpoint, EndpointMethod, PostbackRequest, QueuedResponse};
pub use processor::PostbackProcessor;
pub use template::PostbackTemplate;
