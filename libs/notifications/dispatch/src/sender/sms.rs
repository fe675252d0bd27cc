use super::{classify, Sender};
use crate::error::SendError;
use crate::ingestion::{IngestionSink, SmsOutcome};
use crate::models::SmsMessage;
use crate::provider::{SmsGateway, SmsRequest};
use crate::telemetry::{Telemetry, TelemetryEvent};
use async_trait::async_trait;
use http::StatusCode;
use std::sync::Arc;

pub struct SmsSender {
    gateway: Arc<dyn SmsGateway>,
    sink: Arc<dyn IngestionSink>,
    telemetry: Arc<dyn Telemetry>,
    /// Used when a message does not set `From`
    default_from: String,
}

impl SmsSender {
    pub fn new(
        gateway: Arc<dyn SmsGateway>,
        sink: Arc<dyn IngestionSink>,
        telemetry: Arc<dyn Telemetry>,
        default_from: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            sink,
            telemetry,
            default_from: default_from.into(),
        }
    }
}

#[async_trait]
impl Sender<SmsMessage> for SmsSender {
    async fn send(&self, message: &SmsMessage) -> Result<(), SendError> {
        if message.to.trim().is_empty() {
            return Err(SendError::precondition(
                "SMS message must have a recipient in the 'To' field.",
            ));
        }

        let from = message
            .from
            .as_deref()
            .filter(|from| !from.is_empty())
            .unwrap_or(&self.default_from)
            .to_string();

        let response = self
            .gateway
            .send_sms(&SmsRequest {
                to: message.to.clone(),
                from: from.clone(),
                body: message.body.clone(),
            })
            .await?;

        self.sink
            .ingest(SmsOutcome::new(message, &from, &response).into())
            .await;

        classify(
            response,
            StatusCode::CREATED,
            TelemetryEvent::InvalidSmsPayload,
            self.telemetry.as_ref(),
        )
    }

    fn name(&self) -> &'static str {
        "sms-sender"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{MockIngestionSink, OutcomeRecord};
    use crate::provider::{MockSmsGateway, ProviderResponse};
    use crate::telemetry::MockTelemetry;

    fn message() -> SmsMessage {
        SmsMessage {
            to: "+14155550100".into(),
            body: "Your code is 1234".into(),
            ..Default::default()
        }
    }

    fn gateway(status: StatusCode, body: &'static str) -> MockSmsGateway {
        let mut gateway = MockSmsGateway::new();
        gateway
            .expect_send_sms()
            .returning(move |_| Ok(ProviderResponse::new(status, body)));
        gateway
    }

    fn sink_expecting(status: u16, from: &'static str) -> MockIngestionSink {
        let mut sink = MockIngestionSink::new();
        sink.expect_ingest()
            .withf(move |record| {
                matches!(record, OutcomeRecord::Sms(r) if r.status_code == status && r.from == from)
            })
            .times(1)
            .return_const(());
        sink
    }

    fn quiet_telemetry() -> MockTelemetry {
        let mut telemetry = MockTelemetry::new();
        telemetry.expect_track_event().never();
        telemetry
    }

    #[tokio::test]
    async fn test_created_is_success_and_ingested() {
        let mut sink = MockIngestionSink::new();
        sink.expect_ingest()
            .withf(|record| {
                matches!(record, OutcomeRecord::Sms(r) if r.status_code == 201 && r.status == "Created")
            })
            .times(1)
            .return_const(());

        let sender = SmsSender::new(
            Arc::new(gateway(StatusCode::CREATED, r#"{"sid":"SM1"}"#)),
            Arc::new(sink),
            Arc::new(quiet_telemetry()),
            "+15550000000",
        );

        sender.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_default_sender_applied() {
        let mut gateway = MockSmsGateway::new();
        gateway
            .expect_send_sms()
            .withf(|request| request.from == "+15550000000" && request.to == "+14155550100")
            .times(1)
            .returning(|_| Ok(ProviderResponse::new(StatusCode::CREATED, "")));

        let sender = SmsSender::new(
            Arc::new(gateway),
            Arc::new(sink_expecting(201, "+15550000000")),
            Arc::new(quiet_telemetry()),
            "+15550000000",
        );

        sender.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_message_sender_overrides_default() {
        let mut message = message();
        message.from = Some("DotFlyer".into());

        let sender = SmsSender::new(
            Arc::new(gateway(StatusCode::CREATED, "")),
            Arc::new(sink_expecting(201, "DotFlyer")),
            Arc::new(quiet_telemetry()),
            "+15550000000",
        );

        sender.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn test_bad_request_tracks_telemetry() {
        let mut telemetry = MockTelemetry::new();
        telemetry
            .expect_track_event()
            .withf(|event, message| {
                *event == TelemetryEvent::InvalidSmsPayload && message.contains("21211")
            })
            .times(1)
            .return_const(());

        let sender = SmsSender::new(
            Arc::new(gateway(StatusCode::BAD_REQUEST, r#"{"code":21211}"#)),
            Arc::new(sink_expecting(400, "+15550000000")),
            Arc::new(telemetry),
            "+15550000000",
        );

        sender.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn test_other_status_fails_after_ingesting() {
        let sender = SmsSender::new(
            Arc::new(gateway(StatusCode::UNAUTHORIZED, "Authenticate")),
            Arc::new(sink_expecting(401, "+15550000000")),
            Arc::new(quiet_telemetry()),
            "+15550000000",
        );

        let err = sender.send(&message()).await.unwrap_err();
        assert!(matches!(
            &err,
            SendError::Request { status: StatusCode::UNAUTHORIZED, body, .. } if body == "Authenticate"
        ));
    }

    #[tokio::test]
    async fn test_empty_recipient_is_precondition() {
        let mut gateway = MockSmsGateway::new();
        gateway.expect_send_sms().never();
        let mut sink = MockIngestionSink::new();
        sink.expect_ingest().never();

        let sender = SmsSender::new(
            Arc::new(gateway),
            Arc::new(sink),
            Arc::new(quiet_telemetry()),
            "+15550000000",
        );

        let mut message = message();
        message.to = "  ".into();
        let err = sender.send(&message).await.unwrap_err();
        assert!(matches!(err, SendError::Precondition(_)));
        assert!(err.is_permanent());
    }
}
