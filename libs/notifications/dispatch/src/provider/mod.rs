//! Delivery provider clients.
//!
//! A gateway only performs the HTTP exchange and reports what the provider
//! said. Deciding whether a status is success, a payload problem or a
//! failure is the sender's job.

pub mod sendgrid;
pub mod twilio;

pub use sendgrid::SendGridGateway;
pub use twilio::TwilioGateway;

use crate::error::SendError;
use crate::models::Contact;
use async_trait::async_trait;
use http::StatusCode;
use std::time::Duration;

/// Status and raw body returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResponse {
    pub status: StatusCode,
    pub body: String,
    /// Parsed `Retry-After` header, when present in seconds
    pub retry_after: Option<Duration>,
}

impl ProviderResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Textual status name, e.g. "Created" for 201.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    pub(crate) async fn from_reqwest(response: reqwest::Response) -> Self {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();

        Self {
            status,
            body,
            retry_after,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsRequest {
    pub to: String,
    pub from: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    /// Base64-encoded file content
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRequest {
    pub from: Contact,
    pub to: Vec<Contact>,
    pub cc: Vec<Contact>,
    pub bcc: Vec<Contact>,
    pub subject: String,
    pub html: String,
    pub text: String,
    pub attachments: Vec<EmailAttachment>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send_sms(&self, request: &SmsRequest) -> Result<ProviderResponse, SendError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send_email(&self, request: &EmailRequest) -> Result<ProviderResponse, SendError>;
}
