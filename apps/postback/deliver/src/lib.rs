//! Postback Delivery Agent
//!
//! Consumes `METHOD,TARGET` postback instructions from a Kafka topic, one at
//! a time, and delivers each one over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! Kafka topic (KAFKA_POSTBACK_TOPIC)
//!   ↓ (consumer group, prefetch depth 1, manual commit)
//! Worker<KafkaConsumer, PostbackProcessor>
//!   ↓ (parse, deliver with immediate retries)
//! ReqwestExecutor
//!   ↓
//! Postback target
//! ```
//!
//! ## Exit status
//!
//! - SIGINT/SIGTERM: the in-flight fetch or delivery is interrupted and the
//!   process exits with status 0.
//! - Too many consecutive fetch failures: the worker aborts and `run`
//!   returns an error, so the process exits non-zero and its supervisor
//!   restarts it.

pub mod health;

use core_config::{env_parse_or_default, Environment, FromEnv};
use domain_postback::{DeliveryConfig, PostbackProcessor, ReqwestExecutor};
use eyre::{Result, WrapErr};
use health::{health_router, HealthState};
use kafka_worker::{metrics, KafkaConfig, KafkaConsumer, Worker};
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

const DEFAULT_HEALTH_PORT: u16 = 8082;

/// Start the health and metrics HTTP server
///
/// - Liveness: `/health`, `/healthz`
/// - Prometheus metrics: `/metrics`
async fn start_health_server(state: HealthState, port: u16) -> Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind health server to {}", addr))?;

    info!(port = %port, "Health server listening");

    axum::serve(listener, health_router(state))
        .await
        .wrap_err("Health server failed")?;

    Ok(())
}

/// Run the delivery agent
///
/// 1. Sets up error reports and structured logging
/// 2. Loads Kafka and delivery configuration
/// 3. Connects to Kafka, retrying while the brokers come up
/// 4. Runs the worker until shutdown or fatal abort
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is missing or invalid
/// - Kafka cannot be reached within the connect attempts
/// - The worker aborts after too many consecutive fetch failures
pub async fn run() -> Result<()> {
    let started = Instant::now();

    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    metrics::init_metrics();

    let app_name = env!("CARGO_PKG_NAME");
    let app_version = env!("CARGO_PKG_VERSION");
    info!(name = %app_name, version = %app_version, "Starting postback delivery agent");
    info!("Environment: {:?}", environment);

    let health_port: u16 = env_parse_or_default("HEALTH_PORT", DEFAULT_HEALTH_PORT)
        .wrap_err("Failed to load health server port")?;

    let kafka_config = KafkaConfig::from_env().wrap_err("Failed to load Kafka configuration")?;
    let delivery_config = DeliveryConfig::from_env().wrap_err("Failed to load delivery configuration")?;
    info!(
        brokers = %kafka_config.bootstrap_servers(),
        topic = %kafka_config.topic,
        consumer_group = %kafka_config.consumer_group,
        max_connect_attempts = kafka_config.max_connect_attempts,
        fetch_failure_threshold = kafka_config.fetch_failure_threshold,
        timeout_secs = delivery_config.timeout.as_secs(),
        max_attempts = delivery_config.max_attempts,
        "Configuration loaded"
    );

    let executor = ReqwestExecutor::new().wrap_err("Failed to create HTTP client")?;
    let processor = PostbackProcessor::new(executor, delivery_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => {
                let _ = shutdown_tx.send(true);
            }
            // dropping the sender leaves the worker running
            Err(e) => error!("Error waiting for shutdown signal: {:?}", e),
        }
    });

    let health_state = HealthState::new(app_name, app_version, kafka_config.topic.clone());
    tokio::spawn(async move {
        if let Err(e) = start_health_server(health_state, health_port).await {
            error!(error = %e, "Health server failed");
        }
    });

    info!("Connecting to Kafka...");
    let consumer = match KafkaConsumer::connect(&kafka_config, shutdown_rx.clone())
        .await
        .wrap_err("Failed to connect to Kafka")?
    {
        Some(consumer) => consumer,
        None => {
            info!(
                uptime_secs = started.elapsed().as_secs(),
                "Postback delivery agent stopped before Kafka was reachable"
            );
            return Ok(());
        }
    };
    info!("Connected to Kafka successfully");

    let worker = Worker::new(consumer, processor, &kafka_config);
    let result = worker.run(shutdown_rx).await;

    let uptime_secs = started.elapsed().as_secs();
    match result {
        Ok(()) => {
            info!(uptime_secs, "Postback delivery agent stopped");
            Ok(())
        }
        Err(e) => {
            error!(uptime_secs, error = %e, "Postback delivery agent aborted");
            Err(e).wrap_err("Postback worker aborted")
        }
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c().await.wrap_err("Failed to install Ctrl+C handler")
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .wrap_err("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<(), eyre::Report>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        result = ctrl_c => {
            result?;
            info!("Received Ctrl+C, initiating shutdown...");
        },
        result = terminate => {
            result?;
            info!("Received SIGTERM, initiating shutdown...");
        },
    }

    Ok(())
}
