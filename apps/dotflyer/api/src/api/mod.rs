use crate::auth::jwt_auth_middleware;
use crate::state::AppState;
use axum::{
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Router,
};
use core_config::server::ServerConfig;
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod email;
pub mod health;
pub mod sms;

/// Header carrying the client's deduplication key.
pub const MESSAGE_ID_HEADER: &str = "message-id";

/// Returned once a message is on the stream. Acceptance is not delivery.
#[derive(Debug, Serialize)]
pub struct Enqueued {
    pub status: &'static str,
    pub duplicate: bool,
}

impl Enqueued {
    pub fn new(duplicate: bool) -> Self {
        Self {
            status: "enqueued",
            duplicate,
        }
    }
}

pub(crate) fn message_id(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(MESSAGE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

/// All routes under `/dotflyer`. The send endpoints require a bearer token,
/// the liveness probe does not.
pub fn routes(state: AppState) -> Router {
    let send = Router::new()
        .route("/sms", post(sms::send_sms))
        .route("/email", post(email::send_email))
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            jwt_auth_middleware,
        ));

    send.route("/healthz/live", get(health::live_handler))
        .with_state(state)
}

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .nest("/dotflyer", routes(state))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.request_timeout,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::{Claims, JwtAuth};
    use crate::config::AuthConfig;
    use crate::state::AppState;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use core_config::{AppInfo, server::ServerConfig};
    use dispatch::lookup::E164Lookup;
    use dispatch::{EmailMessage, SmsMessage};
    use http_body_util::BodyExt;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use messaging::nats::{PublishReceipt, Publisher, TopicError};
    use messaging::Message;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    const SECRET: &str = "gateway-test-secret";

    /// Keeps published messages and mimics the stream's duplicate window.
    #[derive(Default)]
    pub struct RecordingPublisher<M> {
        pub published: Mutex<Vec<(M, Option<String>)>>,
        seen: Mutex<HashSet<String>>,
        pub fail: bool,
    }

    impl<M> RecordingPublisher<M> {
        pub fn failing() -> Self {
            Self {
                published: Mutex::new(Vec::new()),
                seen: Mutex::new(HashSet::new()),
                fail: true,
            }
        }

        pub fn count(&self) -> usize {
            self.published.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl<M: Message + Clone> Publisher<M> for RecordingPublisher<M> {
        async fn publish(
            &self,
            message: &M,
            dedup_key: Option<&str>,
        ) -> Result<PublishReceipt, TopicError> {
            if self.fail {
                return Err(TopicError::Publish("no responders".into()));
            }
            let duplicate = dedup_key
                .map(|key| !self.seen.lock().unwrap().insert(key.to_string()))
                .unwrap_or(false);
            let mut published = self.published.lock().unwrap();
            if !duplicate {
                published.push((message.clone(), dedup_key.map(str::to_string)));
            }
            Ok(PublishReceipt {
                stream: "TEST".into(),
                sequence: published.len() as u64,
                duplicate,
            })
        }
    }

    pub struct Gateway {
        pub router: Router,
        pub sms: Arc<RecordingPublisher<SmsMessage>>,
        pub email: Arc<RecordingPublisher<EmailMessage>>,
    }

    pub fn gateway() -> Gateway {
        gateway_with(RecordingPublisher::default(), RecordingPublisher::default())
    }

    pub fn gateway_with(
        sms: RecordingPublisher<SmsMessage>,
        email: RecordingPublisher<EmailMessage>,
    ) -> Gateway {
        let sms = Arc::new(sms);
        let email = Arc::new(email);
        let state = AppState {
            app: AppInfo {
                name: "dotflyer_api",
                version: "0.1.0",
            },
            auth: JwtAuth::new(&AuthConfig {
                secret: SECRET.into(),
                issuer: None,
                audience: None,
            }),
            sms: sms.clone(),
            email: email.clone(),
            lookup: Arc::new(E164Lookup),
        };

        Gateway {
            router: super::router(state, &ServerConfig::default()),
            sms,
            email,
        }
    }

    pub fn token(roles: &[&str]) -> String {
        let claims = Claims {
            sub: "client-1".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    pub async fn post_json(
        router: &Router,
        uri: &str,
        token: Option<&str>,
        message_id: Option<&str>,
        body: &str,
    ) -> (StatusCode, serde_json::Value) {
        let mut request = Request::post(uri).header("content-type", "application/json");
        if let Some(token) = token {
            request = request.header("authorization", format!("Bearer {token}"));
        }
        if let Some(id) = message_id {
            request = request.header("Message-Id", id);
        }

        let response = router
            .clone()
            .oneshot(request.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
