//! Prometheus metrics for the consumer loop

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Subsequent calls are no-ops.
///
/// If another recorder is already installed, metrics keep flowing to it
/// and `render_metrics` returns an empty string.
pub fn init_metrics() {
    let _ = PROMETHEUS_HANDLE.get_or_try_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics initialized");
            Ok(handle)
        }
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            Err(())
        }
    });
}

/// Render metrics in the Prometheus text format
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Metric helper labelled with the topic and processor name
#[derive(Clone, Debug)]
pub struct WorkerMetrics {
    topic: String,
    processor: String,
}

impl WorkerMetrics {
    pub fn new(topic: impl Into<String>, processor: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            processor: processor.into(),
        }
    }

    pub fn message_fetched(&self) {
        counter!("kafka_worker_messages_fetched_total", "topic" => self.topic.clone()).increment(1);
    }

    pub fn fetch_failed(&self) {
        counter!("kafka_worker_fetch_failures_total", "topic" => self.topic.clone()).increment(1);
    }

    pub fn committed(&self) {
        counter!("kafka_worker_commits_total", "topic" => self.topic.clone()).increment(1);
    }

    pub fn commit_failed(&self) {
        counter!("kafka_worker_commit_failures_total", "topic" => self.topic.clone()).increment(1);
    }

    /// Record a processed message; `outcome` is `delivered` or an error label
    pub fn processed(&self, outcome: &'static str, duration: Duration) {
        counter!(
            "kafka_worker_messages_processed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone(),
            "outcome" => outcome
        )
        .increment(1);

        histogram!(
            "kafka_worker_processing_duration_seconds",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone()
        )
        .record(duration.as_secs_f64());
    }
}
