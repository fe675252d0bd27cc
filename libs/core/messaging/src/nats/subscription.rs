//! Stream provisioning and pull-consumer access for a topic.

use crate::nats::error::TopicError;
use crate::nats::topic::TopicConfig;
use async_nats::header::NATS_MESSAGE_ID;
use async_nats::jetstream::consumer::pull::Config as PullConfig;
use async_nats::jetstream::consumer::{AckPolicy, PullConsumer};
use async_nats::jetstream::stream::Config as StreamConfig;
use async_nats::jetstream::{AckKind, Context};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Create the stream if missing. An existing stream whose duplicate window
/// differs from `duplicate_window` is updated in place.
pub(crate) async fn ensure_stream(
    jetstream: &Context,
    name: &str,
    subject: &str,
    duplicate_window: Duration,
    max_age: Duration,
) -> Result<(), TopicError> {
    match jetstream.get_stream(name).await {
        Ok(mut stream) => {
            let info = stream
                .info()
                .await
                .map_err(TopicError::from_jetstream_error)?;
            debug!(stream = %name, messages = info.state.messages, "Stream already exists");

            if info.config.duplicate_window != duplicate_window {
                let mut config = info.config.clone();
                config.duplicate_window = duplicate_window;
                jetstream
                    .update_stream(config)
                    .await
                    .map_err(TopicError::from_jetstream_error)?;
                info!(
                    stream = %name,
                    duplicate_window_secs = duplicate_window.as_secs(),
                    "Updated stream duplicate window"
                );
            }
            Ok(())
        }
        Err(_) => {
            info!(stream = %name, subject = %subject, "Creating stream");
            jetstream
                .create_stream(StreamConfig {
                    name: name.to_string(),
                    subjects: vec![subject.to_string()],
                    duplicate_window,
                    max_age,
                    ..Default::default()
                })
                .await
                .map_err(TopicError::from_jetstream_error)?;
            info!(stream = %name, "Stream created");
            Ok(())
        }
    }
}

/// Pull-side access to a topic's stream.
#[derive(Clone)]
pub struct TopicSubscription {
    jetstream: Context,
    config: TopicConfig,
}

impl TopicSubscription {
    pub fn new(jetstream: Context, config: TopicConfig) -> Self {
        Self { jetstream, config }
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }

    pub async fn ensure_stream(&self) -> Result<(), TopicError> {
        ensure_stream(
            &self.jetstream,
            &self.config.stream_name,
            &self.config.subject,
            self.config.duplicate_window,
            self.config.max_age,
        )
        .await
    }

    /// Get or create the durable pull consumer.
    pub async fn ensure_consumer(&self) -> Result<PullConsumer, TopicError> {
        let stream = self
            .jetstream
            .get_stream(&self.config.stream_name)
            .await
            .map_err(TopicError::from_jetstream_error)?;

        if let Ok(consumer) = stream
            .get_consumer::<PullConfig>(&self.config.consumer_name)
            .await
        {
            debug!(consumer = %self.config.consumer_name, "Consumer already exists");
            return Ok(consumer);
        }

        info!(
            consumer = %self.config.consumer_name,
            stream = %self.config.stream_name,
            "Creating durable consumer"
        );

        stream
            .create_consumer(PullConfig {
                durable_name: Some(self.config.consumer_name.clone()),
                name: Some(self.config.consumer_name.clone()),
                ack_policy: AckPolicy::Explicit,
                ack_wait: self.config.ack_wait,
                max_deliver: self.config.max_deliver,
                filter_subject: self.config.subject.clone(),
                ..Default::default()
            })
            .await
            .map_err(TopicError::from_jetstream_error)
    }

    /// Fetch up to `batch_size` raw deliveries. Decoding is left to the caller
    /// so undecodable payloads can be settled explicitly.
    pub async fn fetch(
        &self,
        consumer: &PullConsumer,
        batch_size: usize,
    ) -> Result<Vec<Delivery>, TopicError> {
        let mut messages = consumer
            .fetch()
            .max_messages(batch_size)
            .expires(self.config.fetch_timeout)
            .messages()
            .await
            .map_err(TopicError::from_jetstream_error)?;

        let mut deliveries = Vec::new();
        while let Some(next) = messages.next().await {
            match next {
                Ok(message) => deliveries.push(Delivery::new(message)),
                Err(e) => warn!(error = %e, "Error receiving message"),
            }
        }

        Ok(deliveries)
    }
}

/// A raw message pulled from the stream, not yet decoded.
pub struct Delivery {
    message: async_nats::jetstream::Message,
    /// Stream sequence number
    pub sequence: u64,
    /// 1 on first delivery
    pub delivery_count: u64,
}

impl Delivery {
    fn new(message: async_nats::jetstream::Message) -> Self {
        let (sequence, delivery_count) = match message.info() {
            Ok(info) => (info.stream_sequence, info.delivered.max(1) as u64),
            Err(e) => {
                warn!(error = %e, "Failed to read delivery metadata");
                (0, 1)
            }
        };

        Self {
            message,
            sequence,
            delivery_count,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    /// Payload as text for log lines.
    pub fn payload_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.payload())
    }

    /// The deduplication key the publisher attached, if any.
    pub fn message_id(&self) -> Option<&str> {
        self.message
            .headers
            .as_ref()
            .and_then(|headers| headers.get(NATS_MESSAGE_ID))
            .map(|value| value.as_str())
    }

    pub fn decode<M: DeserializeOwned>(&self) -> Result<M, serde_json::Error> {
        serde_json::from_slice(self.payload())
    }

    pub fn is_redelivery(&self) -> bool {
        self.delivery_count > 1
    }

    pub async fn ack(&self) -> Result<(), TopicError> {
        self.message
            .ack()
            .await
            .map_err(|e| TopicError::consumer_error(e.to_string()))
    }

    /// Ask for redelivery after `delay`.
    pub async fn nak_with_delay(&self, delay: Duration) -> Result<(), TopicError> {
        self.message
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(|e| TopicError::consumer_error(e.to_string()))
    }

    /// Settle as failed; the server never redelivers it.
    pub async fn term(&self) -> Result<(), TopicError> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(|e| TopicError::consumer_error(e.to_string()))
    }
}
