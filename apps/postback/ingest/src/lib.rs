//! Postback Ingest API
//!
//! Accepts a postback batch over HTTP, renders one URL per data item from the
//! endpoint template, and publishes each as a `METHOD,TARGET` message to the
//! postback topic for the delivery agent.
//!
//! ```text
//! POST /postbacks
//! {
//!   "endpoint": { "method": "GET", "url": "https://cb.example.com/data?title={mascot}" },
//!   "data": [ { "mascot": "Gopher" } ]
//! }
//! ```

pub mod error;
pub mod publisher;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use core_config::{server::ServerConfig, Environment, FromEnv};
use domain_postback::{PostbackRequest, QueuedResponse};
use error::IngestError;
use eyre::{Result, WrapErr};
use kafka_worker::{KafkaConfig, KafkaProducer};
use publisher::PostbackPublisher;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<dyn PostbackPublisher>,
}

impl AppState {
    pub fn new(publisher: impl PostbackPublisher + 'static) -> Self {
        Self {
            publisher: Arc::new(publisher),
        }
    }
}

/// Render and enqueue a batch of postbacks
pub async fn create_postbacks(
    State(state): State<AppState>,
    payload: Result<Json<PostbackRequest>, JsonRejection>,
) -> Result<Json<QueuedResponse>, IngestError> {
    let start = Instant::now();
    let Json(request) = payload?;

    let template = request.template();
    let messages: Vec<String> = template
        .render_all(&request.data)?
        .iter()
        .map(ToString::to_string)
        .collect();

    for message in &messages {
        debug!(postback = %message, "Pushing postback to Kafka");
    }

    state
        .publisher
        .publish(messages.clone())
        .await
        .map_err(|e| IngestError::Publish(e.to_string()))?;

    info!(
        count = messages.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Postback complete. {} postback(s) queued",
        messages.len()
    );

    Ok(Json(QueuedResponse { queued: messages.len() }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/postbacks", post(create_postbacks))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the ingest API until SIGINT/SIGTERM
pub async fn run() -> Result<()> {
    core_config::tracing::install_color_eyre();
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    info!(
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Starting postback ingest API"
    );

    let kafka_config = KafkaConfig::from_env().wrap_err("Failed to load Kafka configuration")?;
    let server_config = ServerConfig::from_env().wrap_err("Failed to load server configuration")?;

    let producer = KafkaProducer::new(&kafka_config).wrap_err("Failed to create Kafka producer")?;
    info!(
        brokers = %kafka_config.bootstrap_servers(),
        topic = %producer.topic(),
        "Kafka producer ready"
    );

    let app = router(AppState::new(producer));

    let listener = TcpListener::bind(server_config.address())
        .await
        .wrap_err_with(|| format!("Failed to bind to {}", server_config.address()))?;
    info!("Server starting on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server failed")?;

    info!("Postback ingest API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully");
        },
    }
}
