//! Dead-letter stream for messages that will never be delivered.

use crate::nats::error::TopicError;
use crate::nats::subscription::Delivery;
use crate::nats::topic::TopicConfig;
use async_nats::jetstream::stream::Config as StreamConfig;
use async_nats::jetstream::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Record stored on the dead-letter stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeadLetter {
    /// Subject the message was originally published to
    pub topic: String,
    /// Raw payload, kept as text even when it is not valid JSON
    pub payload: String,
    pub error: String,
    pub original_sequence: u64,
    pub delivery_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn from_delivery(topic: &str, delivery: &Delivery, error: impl Into<String>) -> Self {
        Self {
            topic: topic.to_string(),
            payload: delivery.payload_lossy().into_owned(),
            error: error.into(),
            original_sequence: delivery.sequence,
            delivery_count: delivery.delivery_count,
            message_id: delivery.message_id().map(str::to_string),
            failed_at: Utc::now(),
        }
    }
}

pub struct DeadLetterQueue {
    jetstream: Context,
    stream: String,
    subject: String,
}

impl DeadLetterQueue {
    pub fn new(jetstream: Context, config: &TopicConfig) -> Self {
        Self {
            jetstream,
            stream: config.dlq_stream.clone(),
            subject: config.dlq_subject.clone(),
        }
    }

    pub async fn ensure_stream(&self) -> Result<(), TopicError> {
        if self.jetstream.get_stream(&self.stream).await.is_ok() {
            debug!(stream = %self.stream, "Dead-letter stream already exists");
            return Ok(());
        }

        info!(stream = %self.stream, "Creating dead-letter stream");
        self.jetstream
            .create_stream(StreamConfig {
                name: self.stream.clone(),
                subjects: vec![self.subject.clone()],
                max_messages: 10_000,
                max_age: Duration::from_secs(30 * 24 * 60 * 60),
                ..Default::default()
            })
            .await
            .map_err(TopicError::from_jetstream_error)?;

        Ok(())
    }

    /// Returns the dead-letter stream sequence.
    pub async fn send(&self, letter: &DeadLetter) -> Result<u64, TopicError> {
        let payload = serde_json::to_vec(letter)?;

        let ack = self
            .jetstream
            .publish(self.subject.clone(), payload.into())
            .await
            .map_err(|e| TopicError::publish_error(e.to_string()))?
            .await
            .map_err(|e| TopicError::publish_error(e.to_string()))?;

        debug!(
            topic = %letter.topic,
            original_sequence = letter.original_sequence,
            sequence = ack.sequence,
            "Dead-lettered message"
        );

        Ok(ack.sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_letter_omits_missing_message_id() {
        let letter = DeadLetter {
            topic: "dotflyer.sms".to_string(),
            payload: "not json".to_string(),
            error: "malformed payload".to_string(),
            original_sequence: 7,
            delivery_count: 1,
            message_id: None,
            failed_at: Utc::now(),
        };

        let json = serde_json::to_value(&letter).unwrap();
        assert_eq!(json["payload"], "not json");
        assert_eq!(json["original_sequence"], 7);
        assert!(json.get("message_id").is_none());
    }
}
