//! Topic definitions and runtime configuration.

use crate::Message;
use std::time::Duration;

/// Compile-time description of a topic.
///
/// One topic carries exactly one message type, so the consumer never has to
/// inspect payloads to pick a handler.
pub trait Topic {
    type Message: Message;

    /// JetStream stream name (e.g. "DOTFLYER_SMS")
    const STREAM_NAME: &'static str;

    /// The single subject bound to the stream (e.g. "dotflyer.sms")
    const SUBJECT: &'static str;

    /// Durable consumer shared by all worker replicas
    const CONSUMER_NAME: &'static str;

    /// Stream receiving dead letters
    const DLQ_STREAM: &'static str;

    /// Deliveries before a failing message is dead-lettered
    const MAX_DELIVER: i64 = 5;

    const ACK_WAIT_SECS: u64 = 30;

    /// Window in which a repeated `Nats-Msg-Id` is dropped by the server
    const DUPLICATE_WINDOW_SECS: u64 = 600;
}

/// Runtime configuration for publishing to and consuming from a topic.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    pub stream_name: String,
    pub subject: String,
    pub consumer_name: String,
    pub dlq_stream: String,
    pub dlq_subject: String,
    pub max_deliver: i64,
    pub ack_wait: Duration,
    pub duplicate_window: Duration,
    /// Retention for undelivered messages
    pub max_age: Duration,
    pub batch_size: usize,
    pub fetch_timeout: Duration,
    /// Upper bound on handlers running at once
    pub max_concurrent: usize,
    /// How long shutdown waits for in-flight handlers before cancelling them
    pub drain_timeout: Duration,
}

impl TopicConfig {
    pub fn from_topic<T: Topic>() -> Self {
        Self {
            stream_name: T::STREAM_NAME.to_string(),
            subject: T::SUBJECT.to_string(),
            consumer_name: T::CONSUMER_NAME.to_string(),
            dlq_stream: T::DLQ_STREAM.to_string(),
            dlq_subject: format!("{}.dead", T::SUBJECT),
            max_deliver: T::MAX_DELIVER,
            ack_wait: Duration::from_secs(T::ACK_WAIT_SECS),
            duplicate_window: Duration::from_secs(T::DUPLICATE_WINDOW_SECS),
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
            batch_size: 10,
            fetch_timeout: Duration::from_secs(5),
            max_concurrent: 8,
            drain_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_max_deliver(mut self, max_deliver: i64) -> Self {
        self.max_deliver = max_deliver;
        self
    }

    /// Prefix every stream, subject and consumer name. Used to isolate
    /// environments (and tests) sharing one NATS server.
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        let upper = namespace.to_uppercase();
        let lower = namespace.to_lowercase();
        self.stream_name = format!("{upper}_{}", self.stream_name);
        self.dlq_stream = format!("{upper}_{}", self.dlq_stream);
        self.subject = format!("{lower}.{}", self.subject);
        self.dlq_subject = format!("{lower}.{}", self.dlq_subject);
        self.consumer_name = format!("{lower}-{}", self.consumer_name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Ping;

    impl Message for Ping {
        const KIND: &'static str = "ping";

        fn recipients(&self) -> String {
            String::new()
        }
    }

    struct PingTopic;

    impl Topic for PingTopic {
        type Message = Ping;
        const STREAM_NAME: &'static str = "PINGS";
        const SUBJECT: &'static str = "pings.send";
        const CONSUMER_NAME: &'static str = "ping-processor";
        const DLQ_STREAM: &'static str = "PINGS_DLQ";
        const MAX_DELIVER: i64 = 3;
    }

    #[test]
    fn test_config_from_topic() {
        let config = TopicConfig::from_topic::<PingTopic>();
        assert_eq!(config.stream_name, "PINGS");
        assert_eq!(config.subject, "pings.send");
        assert_eq!(config.consumer_name, "ping-processor");
        assert_eq!(config.dlq_stream, "PINGS_DLQ");
        assert_eq!(config.dlq_subject, "pings.send.dead");
        assert_eq!(config.max_deliver, 3);
        assert_eq!(config.duplicate_window, Duration::from_secs(600));
        assert_eq!(config.ack_wait, Duration::from_secs(30));
    }

    #[test]
    fn test_builders_clamp_zero() {
        let config = TopicConfig::from_topic::<PingTopic>()
            .with_max_concurrent(0)
            .with_batch_size(0)
            .with_duplicate_window(Duration::from_secs(60));

        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.batch_size, 1);
        assert_eq!(config.duplicate_window, Duration::from_secs(60));
    }

    #[test]
    fn test_namespace_prefixes_every_name() {
        let config = TopicConfig::from_topic::<PingTopic>().with_namespace("Test1");
        assert_eq!(config.stream_name, "TEST1_PINGS");
        assert_eq!(config.dlq_stream, "TEST1_PINGS_DLQ");
        assert_eq!(config.subject, "test1.pings.send");
        assert_eq!(config.dlq_subject, "test1.pings.send.dead");
        assert_eq!(config.consumer_name, "test1-ping-processor");
    }
}
