//! DotFlyer HTTP gateway.
//!
//! Authenticates callers, validates SMS and email payloads and publishes
//! them to their topic. Delivery happens later in the worker, so a 200 here
//! means "accepted for delivery".
//!
//! ```text
//! client ──Bearer JWT──▶ /dotflyer/{sms,email}
//!                            │ roles → validate → publish(Message-Id)
//!                            ▼
//!                   DOTFLYER_SMS / DOTFLYER_EMAIL streams
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod state;

use async_nats::jetstream::{self, Context};
use auth::JwtAuth;
use config::Config;
use core_config::tracing::{init_tracing, install_color_eyre};
use dispatch::lookup::{E164Lookup, PhoneNumberLookup, TwilioLookup};
use dispatch::{EmailTopic, SmsTopic};
use eyre::{Result, WrapErr};
use messaging::nats::{Topic, TopicConfig, TopicPublisher};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

pub use api::router;

/// Publisher for `T` whose stream exists before the first request.
async fn publisher<T: Topic>(
    jetstream: &Context,
    duplicate_window: Duration,
) -> Result<Arc<TopicPublisher<T::Message>>> {
    let publisher = TopicPublisher::new(
        jetstream.clone(),
        TopicConfig::from_topic::<T>().with_duplicate_window(duplicate_window),
    );
    publisher
        .ensure_stream()
        .await
        .wrap_err_with(|| format!("Failed to ensure stream {}", T::STREAM_NAME))?;
    Ok(Arc::new(publisher))
}

pub async fn run() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env().wrap_err("Failed to load configuration")?;
    init_tracing(&config.environment);

    info!(
        name = %config.app.name,
        version = %config.app.version,
        environment = ?config.environment,
        "Starting DotFlyer API"
    );

    info!(url = %config.nats_url, "Connecting to NATS");
    let client = async_nats::connect(&config.nats_url)
        .await
        .wrap_err_with(|| format!("Failed to connect to NATS at {}", config.nats_url))?;
    let jetstream = jetstream::new(client);

    let sms = publisher::<SmsTopic>(&jetstream, config.duplicate_window).await?;
    let email = publisher::<EmailTopic>(&jetstream, config.duplicate_window).await?;

    let lookup: Arc<dyn PhoneNumberLookup> = match config.twilio.clone() {
        Some(credentials) => {
            info!(url = %config.lookup_url, "Validating phone numbers with Twilio Lookup");
            Arc::new(TwilioLookup::new(credentials, config.lookup_url.clone()))
        }
        None => {
            warn!("Twilio credentials not set, phone numbers are checked by format only");
            Arc::new(E164Lookup)
        }
    };

    let state = AppState {
        app: config.app,
        auth: JwtAuth::new(&config.auth),
        sms,
        email,
        lookup,
    };
    let app = router(state, &config.server);

    let address = config.server.address();
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind {address}"))?;
    info!(address = %address, "DotFlyer API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| error!(error = %e, "Server encountered an error"))
        .wrap_err("Server failed")?;

    info!("DotFlyer API stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. A handler that cannot be installed is
/// logged and never fires.
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
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
