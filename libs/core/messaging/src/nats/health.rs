//! Health endpoints for K8s probes.

use crate::nats::consumer::ConsumerState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub name: String,
    pub version: String,
    pub nats_connected: bool,
    pub consumers: BTreeMap<String, ConsumerState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Shared health state, updated by consumers as they change state.
#[derive(Clone)]
pub struct HealthState {
    name: String,
    version: String,
    inner: Arc<RwLock<HealthStateInner>>,
}

#[derive(Default)]
struct HealthStateInner {
    nats_connected: bool,
    consumers: BTreeMap<String, ConsumerState>,
    fatal: bool,
    last_error: Option<String>,
}

impl HealthState {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            inner: Arc::new(RwLock::new(HealthStateInner::default())),
        }
    }

    pub async fn set_nats_connected(&self, connected: bool) {
        self.inner.write().await.nats_connected = connected;
    }

    pub async fn set_consumer_state(&self, topic: &str, state: ConsumerState) {
        self.inner
            .write()
            .await
            .consumers
            .insert(topic.to_string(), state);
    }

    /// Record an error that the process cannot recover from. Liveness fails
    /// from here on.
    pub async fn mark_fatal(&self, error: impl Into<String>) {
        let mut inner = self.inner.write().await;
        inner.fatal = true;
        inner.last_error = Some(error.into());
    }

    pub async fn set_error(&self, error: Option<String>) {
        self.inner.write().await.last_error = error;
    }

    /// Liveness ignores NATS connectivity; a temporary disconnect must not
    /// restart the pod.
    pub async fn is_alive(&self) -> bool {
        !self.inner.read().await.fatal
    }

    /// Ready once connected and every registered consumer is processing.
    pub async fn is_ready(&self) -> bool {
        let inner = self.inner.read().await;
        inner.nats_connected
            && !inner.fatal
            && !inner.consumers.is_empty()
            && inner
                .consumers
                .values()
                .all(|state| *state == ConsumerState::Processing)
    }

    pub async fn status(&self) -> HealthStatus {
        let ready = self.is_ready().await;
        let inner = self.inner.read().await;
        HealthStatus {
            status: if ready { "healthy" } else { "unhealthy" },
            name: self.name.clone(),
            version: self.version.clone(),
            nats_connected: inner.nats_connected,
            consumers: inner.consumers.clone(),
            last_error: inner.last_error.clone(),
        }
    }
}

/// Serves `/healthz/live`, `/healthz/ready` and, when a recorder handle is
/// attached, `/metrics`.
pub struct HealthServer {
    port: u16,
    state: HealthState,
    metrics_handle: Option<metrics_exporter_prometheus::PrometheusHandle>,
}

impl HealthServer {
    pub fn new(port: u16, state: HealthState) -> Self {
        Self {
            port,
            state,
            metrics_handle: None,
        }
    }

    pub fn with_metrics(mut self, handle: metrics_exporter_prometheus::PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    pub fn state(&self) -> HealthState {
        self.state.clone()
    }

    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/healthz/live", get(live_handler))
            .route("/healthz/ready", get(ready_handler))
            .route("/health", get(ready_handler))
            .with_state(self.state.clone());

        if let Some(handle) = self.metrics_handle.clone() {
            router = router.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        router
    }

    /// Serve until `shutdown` flips to true.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), std::io::Error> {
        let router = self.router();
        let addr = format!("0.0.0.0:{}", self.port);

        info!(addr = %addr, "Starting health server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await
    }
}

async fn live_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let status = state.status().await;
    if state.is_alive().await {
        (StatusCode::OK, Json(status))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(status))
    }
}

async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let status = state.status().await;
    if state.is_ready().await {
        (StatusCode::OK, Json(status))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(status))
    }
}
