use super::{classify, Sender};
use crate::blob::{attachment_filename, BlobStore};
use crate::error::SendError;
use crate::ingestion::{EmailOutcome, IngestionSink};
use crate::models::EmailMessage;
use crate::provider::{EmailAttachment, EmailGateway, EmailRequest};
use crate::telemetry::{Telemetry, TelemetryEvent};
use crate::templates::TemplateRenderer;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::StatusCode;
use std::sync::Arc;
use tracing::debug;

pub struct EmailSender {
    gateway: Arc<dyn EmailGateway>,
    blobs: Arc<dyn BlobStore>,
    sink: Arc<dyn IngestionSink>,
    telemetry: Arc<dyn Telemetry>,
    renderer: Option<Arc<TemplateRenderer>>,
}

impl EmailSender {
    pub fn new(
        gateway: Arc<dyn EmailGateway>,
        blobs: Arc<dyn BlobStore>,
        sink: Arc<dyn IngestionSink>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            gateway,
            blobs,
            sink,
            telemetry,
            renderer: None,
        }
    }

    /// Without a renderer the HTML part is the plain `Body`.
    pub fn with_renderer(mut self, renderer: Arc<TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Downloads every attachment. One missing blob aborts the whole send.
    async fn attachments(&self, message: &EmailMessage) -> Result<Vec<EmailAttachment>, SendError> {
        let mut attachments = Vec::with_capacity(message.attachments().len());
        for uri in message.attachments() {
            let content = self
                .blobs
                .fetch(uri)
                .await?
                .ok_or_else(|| SendError::AttachmentNotFound(uri.clone()))?;

            debug!(uri = %uri, bytes = content.len(), "Attachment downloaded");
            attachments.push(EmailAttachment {
                filename: attachment_filename(uri).to_string(),
                content: STANDARD.encode(content),
            });
        }
        Ok(attachments)
    }
}

#[async_trait]
impl Sender<EmailMessage> for EmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), SendError> {
        if message.to.is_empty() {
            return Err(SendError::precondition(
                "Email message must have at least one recipient in the 'To' field.",
            ));
        }

        let html = match &self.renderer {
            Some(renderer) => renderer.render(message),
            None => message.body.clone(),
        };

        let request = EmailRequest {
            from: message.from.clone(),
            to: message.to.clone(),
            cc: message.cc().to_vec(),
            bcc: message.bcc().to_vec(),
            subject: message.subject.clone(),
            html: html.clone().unwrap_or_default(),
            text: message.body.clone().unwrap_or_default(),
            attachments: self.attachments(message).await?,
        };

        let response = self.gateway.send_email(&request).await?;

        self.sink
            .ingest(EmailOutcome::new(message, html.as_deref(), &response).into())
            .await;

        classify(
            response,
            StatusCode::ACCEPTED,
            TelemetryEvent::InvalidEmailPayload,
            self.telemetry.as_ref(),
        )
    }

    fn name(&self) -> &'static str {
        "email-sender"
    }
}
