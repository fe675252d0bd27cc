//! DotFlyer worker.
//!
//! Runs one topic consumer per message type. Each consumer hands messages
//! to a [`DispatchProcessor`] wrapping the matching sender, which calls the
//! provider, records the outcome and classifies the response.
//!
//! ```text
//! DOTFLYER_SMS   ──▶ TopicConsumer ──▶ SmsSender   ──▶ Twilio
//! DOTFLYER_EMAIL ──▶ TopicConsumer ──▶ EmailSender ──▶ SendGrid
//!                                           │
//!                                           ▼
//!                                   IngestionSink (Kusto | log)
//! ```
//!
//! Health and Prometheus metrics are served on `HEALTH_PORT`.

pub mod config;

use async_nats::jetstream;
use config::{Config, ConsumerSettings};
use core_config::tracing::{init_tracing, install_color_eyre};
use dispatch::blob::HttpBlobStore;
use dispatch::config::KustoConfig;
use dispatch::ingestion::{IngestionSink, KustoSink, LogSink};
use dispatch::provider::{SendGridGateway, TwilioGateway};
use dispatch::telemetry::{MetricsTelemetry, Telemetry};
use dispatch::templates::TemplateRenderer;
use dispatch::{
    DispatchProcessor, EmailMessage, EmailSender, EmailTopic, SmsMessage, SmsSender, SmsTopic,
};
use eyre::{Result, WrapErr};
use messaging::nats::{
    init_metrics, HealthServer, HealthState, Topic, TopicConfig, TopicConsumer, TopicError,
};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub fn topic_config<T: Topic>(settings: &ConsumerSettings) -> TopicConfig {
    TopicConfig::from_topic::<T>()
        .with_duplicate_window(settings.duplicate_window)
        .with_max_concurrent(settings.max_concurrent)
        .with_drain_timeout(settings.drain_timeout)
}

/// Kusto when configured, the log otherwise. A schema failure is not fatal:
/// ingestion errors are logged per record anyway.
async fn ingestion_sink(kusto: Option<KustoConfig>) -> Arc<dyn IngestionSink> {
    let sink: Arc<dyn IngestionSink> = match kusto {
        Some(config) => {
            info!(cluster = %config.cluster_url, database = %config.database, "Ingesting outcomes into Kusto");
            Arc::new(KustoSink::new(config))
        }
        None => {
            warn!("Kusto not configured, outcome records are only logged");
            Arc::new(LogSink)
        }
    };

    if let Err(e) = sink.ensure_schema().await {
        warn!(error = %e, "Failed to ensure outcome tables");
    }
    sink
}

pub async fn run() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env().wrap_err("Failed to load configuration")?;
    init_tracing(&config.environment);

    let metrics_handle = init_metrics().wrap_err("Failed to install Prometheus recorder")?;

    info!(
        name = %config.app.name,
        version = %config.app.version,
        environment = ?config.environment,
        "Starting DotFlyer worker"
    );

    let health = HealthState::new(config.app.name, config.app.version);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    let health_server =
        HealthServer::new(config.health_port, health.clone()).with_metrics(metrics_handle);
    let health_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move {
            if let Err(e) = health_server.run(shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }
    });

    info!(url = %config.nats_url, "Connecting to NATS");
    let client = async_nats::connect(&config.nats_url)
        .await
        .wrap_err_with(|| format!("Failed to connect to NATS at {}", config.nats_url))?;
    health.set_nats_connected(true).await;
    let jetstream = jetstream::new(client);

    let sink = ingestion_sink(config.kusto.clone()).await;
    let telemetry: Arc<dyn Telemetry> = Arc::new(MetricsTelemetry);

    let sms_sender = SmsSender::new(
        Arc::new(TwilioGateway::new(config.twilio.clone())),
        sink.clone(),
        telemetry.clone(),
        config.twilio.from_phone_number.clone(),
    );

    let mut email_sender = EmailSender::new(
        Arc::new(SendGridGateway::new(config.sendgrid.clone())),
        Arc::new(HttpBlobStore::new(config.blobs.clone())),
        sink,
        telemetry,
    );
    if config.templates.enabled {
        let renderer = TemplateRenderer::new().wrap_err("Failed to compile email templates")?;
        email_sender = email_sender.with_renderer(Arc::new(renderer));
    } else {
        info!("Templates disabled, emails are sent with their plain body");
    }

    let sms = TopicConsumer::<SmsMessage, _>::new(
        jetstream.clone(),
        DispatchProcessor::new(sms_sender),
        topic_config::<SmsTopic>(&config.consumers),
    )
    .with_health(health.clone());

    let email = TopicConsumer::<EmailMessage, _>::new(
        jetstream,
        DispatchProcessor::new(email_sender),
        topic_config::<EmailTopic>(&config.consumers),
    )
    .with_health(health.clone());

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        }
    });

    // A consumer that fails to start takes the other one down with it.
    let stop_on_error = |topic: &'static str, result: Result<(), TopicError>| {
        let health = health.clone();
        let shutdown_tx = shutdown_tx.clone();
        async move {
            if let Err(e) = &result {
                error!(topic, error = %e, "Consumer stopped with an error");
                health.mark_fatal(format!("{topic}: {e}")).await;
                let _ = shutdown_tx.send(true);
            }
            result
        }
    };

    let (sms_result, email_result) = tokio::join!(
        async { stop_on_error(SmsTopic::SUBJECT, sms.run(shutdown_rx.clone()).await).await },
        async { stop_on_error(EmailTopic::SUBJECT, email.run(shutdown_rx.clone()).await).await },
    );

    let _ = shutdown_tx.send(true);
    if let Err(e) = health_task.await {
        warn!(error = %e, "Health server task ended abnormally");
    }

    sms_result.wrap_err("SMS consumer failed")?;
    email_result.wrap_err("Email consumer failed")?;

    info!("DotFlyer worker stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating shutdown"),
    }
}
