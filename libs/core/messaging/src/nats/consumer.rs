//! Topic consumer: drives a [`Processor`] over a durable pull consumer.

use crate::nats::dead_letter::{DeadLetter, DeadLetterQueue};
use crate::nats::error::TopicError;
use crate::nats::health::HealthState;
use crate::nats::metrics::ConsumerMetrics;
use crate::nats::subscription::{Delivery, TopicSubscription};
use crate::nats::topic::TopicConfig;
use crate::{ErrorCategory, Message, ProcessingError, Processor};
use async_nats::jetstream::Context;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`TopicConsumer`]. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsumerState {
    Idle,
    Initializing,
    Processing,
    Draining,
    Stopped,
}

/// What to do with a delivery once its handler returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Disposition {
    Ack,
    Retry(Duration),
    DeadLetter(&'static str),
}

pub(crate) fn disposition(
    result: &Result<(), ProcessingError>,
    delivery_count: u64,
    max_deliver: i64,
) -> Disposition {
    let error = match result {
        Ok(()) => return Disposition::Ack,
        Err(error) => error,
    };

    if matches!(error, ProcessingError::Malformed(_)) {
        return Disposition::DeadLetter("malformed");
    }

    match error.category() {
        ErrorCategory::Permanent => Disposition::DeadLetter("permanent"),
        ErrorCategory::Transient | ErrorCategory::RateLimited => {
            if max_deliver > 0 && delivery_count >= max_deliver as u64 {
                Disposition::DeadLetter("exhausted")
            } else {
                let attempts = u32::try_from(delivery_count).unwrap_or(u32::MAX);
                Disposition::Retry(error.backoff_delay(attempts))
            }
        }
    }
}

struct Handler<P> {
    processor: Arc<P>,
    dlq: DeadLetterQueue,
    metrics: ConsumerMetrics,
    topic: String,
    max_deliver: i64,
}

impl<P> Handler<P> {
    async fn handle<M>(&self, delivery: Delivery)
    where
        M: Message,
        P: Processor<M>,
    {
        self.metrics.message_received();

        if delivery.is_redelivery() {
            debug!(
                topic = %self.topic,
                sequence = delivery.sequence,
                delivery_count = delivery.delivery_count,
                "Processing redelivered message"
            );
        }

        let result = match delivery.decode::<Option<M>>() {
            Ok(Some(message)) => {
                let start = Instant::now();
                let result = self.processor.process(&message).await;
                if result.is_ok() {
                    self.metrics.message_processed(start.elapsed());
                    debug!(
                        topic = %self.topic,
                        sequence = delivery.sequence,
                        to = %message.recipients(),
                        duration_ms = start.elapsed().as_millis(),
                        "Message processed"
                    );
                }
                result
            }
            Ok(None) => Err(ProcessingError::permanent("payload deserialized to null")),
            Err(e) => Err(ProcessingError::Malformed(e)),
        };

        if let Err(e) = &result {
            self.metrics.message_failed(e.category().as_str());
            error!(
                topic = %self.topic,
                sequence = delivery.sequence,
                delivery_count = delivery.delivery_count,
                category = %e.category(),
                error = %e,
                payload = %delivery.payload_lossy(),
                "Failed to send"
            );
        }

        let settled = match disposition(&result, delivery.delivery_count, self.max_deliver) {
            Disposition::Ack => delivery.ack().await,
            Disposition::Retry(delay) => {
                self.metrics.message_redelivered();
                debug!(
                    topic = %self.topic,
                    sequence = delivery.sequence,
                    delay_ms = delay.as_millis(),
                    "Requesting redelivery"
                );
                delivery.nak_with_delay(delay).await
            }
            Disposition::DeadLetter(reason) => {
                let reason_text = result
                    .as_ref()
                    .err()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                self.dead_letter(&delivery, reason, reason_text).await
            }
        };

        if let Err(e) = settled {
            warn!(
                topic = %self.topic,
                sequence = delivery.sequence,
                error = %e,
                "Failed to settle message, it will be redelivered after ack wait"
            );
        }
    }

    async fn dead_letter(
        &self,
        delivery: &Delivery,
        reason: &'static str,
        error: String,
    ) -> Result<(), TopicError> {
        let letter = DeadLetter::from_delivery(&self.topic, delivery, error);
        // Only terminate once the copy is stored, otherwise the message is lost.
        self.dlq.send(&letter).await?;
        self.metrics.message_dead_lettered(reason);
        warn!(
            topic = %self.topic,
            sequence = delivery.sequence,
            reason,
            "Message moved to dead-letter stream"
        );
        delivery.term().await
    }
}

/// Consumes one topic, handing each message of type `M` to processor `P`.
///
/// Every worker replica uses the same durable consumer, so a message is
/// handled by exactly one replica. Within a replica up to `max_concurrent`
/// handlers run at once with no ordering between them.
pub struct TopicConsumer<M, P> {
    subscription: TopicSubscription,
    handler: Arc<Handler<P>>,
    config: TopicConfig,
    state: watch::Sender<ConsumerState>,
    health: Option<HealthState>,
    _message: PhantomData<fn() -> M>,
}

impl<M, P> TopicConsumer<M, P>
where
    M: Message,
    P: Processor<M> + 'static,
{
    pub fn new(jetstream: Context, processor: P, config: TopicConfig) -> Self {
        let metrics = ConsumerMetrics::new(&config.subject, processor.name());
        let handler = Handler {
            processor: Arc::new(processor),
            dlq: DeadLetterQueue::new(jetstream.clone(), &config),
            metrics,
            topic: config.subject.clone(),
            max_deliver: config.max_deliver,
        };
        let (state, _) = watch::channel(ConsumerState::Idle);

        Self {
            subscription: TopicSubscription::new(jetstream, config.clone()),
            handler: Arc::new(handler),
            config,
            state,
            health: None,
            _message: PhantomData,
        }
    }

    /// Report state transitions to the worker's health endpoints.
    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }

    async fn transition(&self, next: ConsumerState) {
        let previous = self.state.send_replace(next);
        info!(
            topic = %self.config.subject,
            from = ?previous,
            to = ?next,
            "Consumer state changed"
        );
        if let Some(health) = &self.health {
            health.set_consumer_state(&self.config.subject, next).await;
        }
    }

    async fn initialize(&self) -> Result<async_nats::jetstream::consumer::PullConsumer, TopicError> {
        self.subscription.ensure_stream().await?;
        let consumer = self.subscription.ensure_consumer().await?;
        self.handler.dlq.ensure_stream().await?;

        match self.handler.processor.health_check().await {
            Ok(true) => {}
            Ok(false) => warn!(topic = %self.config.subject, "Processor reports unhealthy dependencies"),
            Err(e) => warn!(topic = %self.config.subject, error = %e, "Processor health check failed"),
        }

        Ok(consumer)
    }

    /// Run until `shutdown` flips to true (or its sender is dropped), then
    /// drain in-flight handlers and stop.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), TopicError> {
        if self.state() != ConsumerState::Idle {
            return Err(TopicError::consumer_error(format!(
                "consumer for {} already started",
                self.config.subject
            )));
        }

        self.transition(ConsumerState::Initializing).await;
        let consumer = match self.initialize().await {
            Ok(consumer) => consumer,
            Err(e) => {
                error!(topic = %self.config.subject, error = %e, "Consumer initialization failed");
                self.transition(ConsumerState::Stopped).await;
                return Err(e);
            }
        };

        info!(
            stream = %self.config.stream_name,
            consumer = %self.config.consumer_name,
            max_concurrent = self.config.max_concurrent,
            "Starting topic consumer"
        );
        self.transition(ConsumerState::Processing).await;

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent));
        let mut tasks: JoinSet<()> = JoinSet::new();

        loop {
            if *shutdown.borrow() {
                break;
            }

            while let Some(joined) = tasks.try_join_next() {
                log_join_result(&self.config.subject, joined);
            }
            self.handler.metrics.in_flight(tasks.len());

            let capacity = semaphore
                .available_permits()
                .min(self.config.batch_size);

            if capacity == 0 {
                tokio::select! {
                    _ = stop_requested(&mut shutdown) => break,
                    Some(joined) = tasks.join_next() => log_join_result(&self.config.subject, joined),
                }
                continue;
            }

            tokio::select! {
                _ = stop_requested(&mut shutdown) => break,

                fetched = self.subscription.fetch(&consumer, capacity) => match fetched {
                    Ok(deliveries) if deliveries.is_empty() => {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                    Ok(deliveries) => {
                        for delivery in deliveries {
                            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                                break;
                            };
                            let handler = Arc::clone(&self.handler);
                            tasks.spawn(async move {
                                handler.handle::<M>(delivery).await;
                                drop(permit);
                            });
                        }
                    }
                    Err(e) => {
                        error!(topic = %self.config.subject, error = %e, "Error fetching messages");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!(topic = %self.config.subject, in_flight = tasks.len(), "Shutdown requested, draining");
        self.transition(ConsumerState::Draining).await;
        self.drain(&mut tasks).await;
        self.handler.metrics.in_flight(0);
        self.transition(ConsumerState::Stopped).await;
        info!(topic = %self.config.subject, "Topic consumer stopped");

        Ok(())
    }

    /// Wait for in-flight handlers up to the drain timeout, then cancel the rest.
    async fn drain(&self, tasks: &mut JoinSet<()>) {
        let subject = &self.config.subject;
        let finished = tokio::time::timeout(self.config.drain_timeout, async {
            while let Some(joined) = tasks.join_next().await {
                log_join_result(subject, joined);
            }
        })
        .await;

        if finished.is_err() {
            warn!(
                topic = %subject,
                remaining = tasks.len(),
                timeout_secs = self.config.drain_timeout.as_secs(),
                "Drain timeout elapsed, cancelling in-flight handlers"
            );
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }
}

async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop request.
    let _ = shutdown.wait_for(|stop| *stop).await;
}

fn log_join_result(topic: &str, joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(topic = %topic, error = %e, "Message handler panicked");
        }
    }
}
