//! JetStream integration test for the SMS dispatch path.
//!
//! Run with: cargo test -p dispatch -- --ignored

use async_trait::async_trait;
use dispatch::error::SendError;
use dispatch::ingestion::{IngestError, IngestionSink, OutcomeRecord};
use dispatch::provider::{ProviderResponse, SmsGateway, SmsRequest};
use dispatch::telemetry::MetricsTelemetry;
use dispatch::{DispatchProcessor, SmsMessage, SmsSender, SmsTopic};
use http::StatusCode;
use messaging::nats::{Publisher, TopicConfig, TopicConsumer, TopicPublisher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{TestDataBuilder, TestNats};
use tokio::sync::watch;

#[derive(Default)]
struct AcceptingGateway {
    calls: AtomicUsize,
}

#[async_trait]
impl SmsGateway for AcceptingGateway {
    async fn send_sms(&self, _request: &SmsRequest) -> Result<ProviderResponse, SendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ProviderResponse::new(StatusCode::CREATED, r#"{"status":"queued"}"#))
    }
}

#[derive(Default)]
struct CountingSink {
    ingested: AtomicUsize,
}

#[async_trait]
impl IngestionSink for CountingSink {
    async fn ingest(&self, _record: OutcomeRecord) {
        self.ingested.fetch_add(1, Ordering::SeqCst);
    }

    async fn ensure_schema(&self) -> Result<(), IngestError> {
        Ok(())
    }
}

async fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) {
    let until = tokio::time::Instant::now() + deadline;
    while !done() && tokio::time::Instant::now() < until {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn test_resubmitted_sms_is_sent_and_ingested_once() {
    let nats = TestNats::new().await;
    let builder = TestDataBuilder::from_test_name("test_resubmitted_sms_is_sent_and_ingested_once");
    let config = TopicConfig::from_topic::<SmsTopic>()
        .with_namespace(&builder.namespace())
        .with_fetch_timeout(Duration::from_millis(500))
        .with_drain_timeout(Duration::from_secs(5));

    let publisher = TopicPublisher::<SmsMessage>::new(nats.jetstream(), config.clone());
    publisher.ensure_stream().await.unwrap();

    let message = SmsMessage {
        to: builder.phone_number(),
        body: "Your code is 123456".to_string(),
        ..Default::default()
    };
    let key = builder.dedup_key("otp");
    let first = publisher.publish(&message, Some(&key)).await.unwrap();
    let second = publisher.publish(&message, Some(&key)).await.unwrap();
    assert!(!first.duplicate);
    assert!(second.duplicate);

    let gateway = Arc::new(AcceptingGateway::default());
    let sink = Arc::new(CountingSink::default());
    let sender = SmsSender::new(
        gateway.clone(),
        sink.clone(),
        Arc::new(MetricsTelemetry),
        "+15550001111",
    );
    let consumer = Arc::new(TopicConsumer::new(
        nats.jetstream(),
        DispatchProcessor::new(sender),
        config,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running = tokio::spawn({
        let consumer = consumer.clone();
        async move { consumer.run(shutdown_rx).await }
    });

    wait_until(Duration::from_secs(10), || {
        sink.ingested.load(Ordering::SeqCst) >= 1
    })
    .await;
    // Leave room for a second delivery to show up if the key were ignored.
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.ingested.load(Ordering::SeqCst), 1);

    shutdown_tx.send(true).unwrap();
    running.await.unwrap().unwrap();
}
