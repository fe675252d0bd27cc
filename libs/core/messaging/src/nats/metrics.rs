//! Prometheus metrics for topic consumers.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

#[derive(Clone)]
pub struct ConsumerMetrics {
    topic: String,
    processor: String,
}

impl ConsumerMetrics {
    pub fn new(topic: &str, processor: &str) -> Self {
        Self {
            topic: topic.to_string(),
            processor: processor.to_string(),
        }
    }

    pub fn message_received(&self) {
        counter!(
            "dotflyer_messages_received_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone()
        )
        .increment(1);
    }

    pub fn message_processed(&self, duration: Duration) {
        counter!(
            "dotflyer_messages_processed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone()
        )
        .increment(1);

        histogram!(
            "dotflyer_message_duration_seconds",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone()
        )
        .record(duration.as_secs_f64());
    }

    pub fn message_failed(&self, category: &str) {
        counter!(
            "dotflyer_messages_failed_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone(),
            "category" => category.to_string()
        )
        .increment(1);
    }

    pub fn message_redelivered(&self) {
        counter!(
            "dotflyer_messages_redelivered_total",
            "topic" => self.topic.clone(),
            "processor" => self.processor.clone()
        )
        .increment(1);
    }

    /// `reason` is "malformed", "permanent" or "exhausted".
    pub fn message_dead_lettered(&self, reason: &'static str) {
        counter!(
            "dotflyer_messages_dead_lettered_total",
            "topic" => self.topic.clone(),
            "reason" => reason
        )
        .increment(1);
    }

    pub fn in_flight(&self, count: usize) {
        gauge!(
            "dotflyer_messages_in_flight",
            "topic" => self.topic.clone()
        )
        .set(count as f64);
    }
}

/// Install the global Prometheus recorder. Fails if one is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}
