//! Topic publisher with transport-level deduplication.

use crate::nats::error::TopicError;
use crate::nats::subscription::ensure_stream;
use crate::nats::topic::TopicConfig;
use crate::Message;
use async_nats::header::{HeaderMap, NATS_MESSAGE_ID};
use async_nats::jetstream::Context;
use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::{debug, info};

/// Server acknowledgement of a publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub stream: String,
    pub sequence: u64,
    /// True when the server dropped the message as a repeat of an earlier
    /// publish carrying the same deduplication key.
    pub duplicate: bool,
}

/// Publishes messages of type `M` to a topic.
#[async_trait]
pub trait Publisher<M: Message>: Send + Sync {
    /// Publish `message`. When `dedup_key` is set, a second publish with the
    /// same key inside the stream's duplicate window is acknowledged but not
    /// stored.
    async fn publish(
        &self,
        message: &M,
        dedup_key: Option<&str>,
    ) -> Result<PublishReceipt, TopicError>;
}

/// JetStream-backed [`Publisher`].
pub struct TopicPublisher<M> {
    jetstream: Context,
    config: TopicConfig,
    _message: PhantomData<fn() -> M>,
}

impl<M> Clone for TopicPublisher<M> {
    fn clone(&self) -> Self {
        Self {
            jetstream: self.jetstream.clone(),
            config: self.config.clone(),
            _message: PhantomData,
        }
    }
}

impl<M: Message> TopicPublisher<M> {
    pub fn new(jetstream: Context, config: TopicConfig) -> Self {
        Self {
            jetstream,
            config,
            _message: PhantomData,
        }
    }

    pub fn subject(&self) -> &str {
        &self.config.subject
    }

    /// Create the topic's stream if it does not exist yet, so publishes made
    /// before any worker starts are retained.
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
}

#[async_trait]
impl<M: Message> Publisher<M> for TopicPublisher<M> {
    async fn publish(
        &self,
        message: &M,
        dedup_key: Option<&str>,
    ) -> Result<PublishReceipt, TopicError> {
        let payload = serde_json::to_vec(message)?;
        let subject = self.config.subject.clone();

        let pending = match dedup_key.filter(|key| !key.is_empty()) {
            Some(key) => {
                let mut headers = HeaderMap::new();
                headers.insert(NATS_MESSAGE_ID, key);
                self.jetstream
                    .publish_with_headers(subject, headers, payload.into())
                    .await
            }
            None => self.jetstream.publish(subject, payload.into()).await,
        }
        .map_err(|e| TopicError::publish_error(e.to_string()))?;

        let ack = pending
            .await
            .map_err(|e| TopicError::publish_error(e.to_string()))?;

        if ack.duplicate {
            info!(
                kind = M::KIND,
                stream = %ack.stream,
                dedup_key = dedup_key.unwrap_or_default(),
                "Duplicate publish dropped by stream"
            );
        } else {
            debug!(
                kind = M::KIND,
                stream = %ack.stream,
                sequence = ack.sequence,
                to = %message.recipients(),
                "Published message"
            );
        }

        Ok(PublishReceipt {
            stream: ack.stream,
            sequence: ack.sequence,
            duplicate: ack.duplicate,
        })
    }
}
