//! SendGrid v3 mail send client.

use crate::config::SendGridConfig;
use crate::error::SendError;
use crate::models::Contact;
use crate::provider::{EmailGateway, EmailRequest, ProviderResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

pub struct SendGridGateway {
    client: Client,
    config: SendGridConfig,
}

impl SendGridGateway {
    pub fn new(config: SendGridConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: EmailAddress<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<Attachment<'a>>,
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: Vec<EmailAddress<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cc: Vec<EmailAddress<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bcc: Vec<EmailAddress<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    name: &'a str,
}

impl<'a> From<&'a Contact> for EmailAddress<'a> {
    fn from(contact: &'a Contact) -> Self {
        Self {
            email: &contact.email,
            name: &contact.name,
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct Attachment<'a> {
    content: &'a str,
    filename: &'a str,
    #[serde(rename = "type")]
    content_type: &'static str,
    disposition: &'static str,
}

impl<'a> From<&'a EmailRequest> for SendGridRequest<'a> {
    fn from(request: &'a EmailRequest) -> Self {
        // SendGrid requires text/plain before text/html and rejects empty values.
        let content = [("text/plain", &request.text), ("text/html", &request.html)]
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(content_type, value)| Content {
                content_type,
                value,
            })
            .collect();

        Self {
            personalizations: vec![Personalization {
                to: request.to.iter().map(EmailAddress::from).collect(),
                cc: request.cc.iter().map(EmailAddress::from).collect(),
                bcc: request.bcc.iter().map(EmailAddress::from).collect(),
            }],
            from: EmailAddress::from(&request.from),
            subject: &request.subject,
            content,
            attachments: request
                .attachments
                .iter()
                .map(|attachment| Attachment {
                    content: &attachment.content,
                    filename: &attachment.filename,
                    content_type: "application/octet-stream",
                    disposition: "attachment",
                })
                .collect(),
        }
    }
}

#[async_trait]
impl EmailGateway for SendGridGateway {
    async fn send_email(&self, request: &EmailRequest) -> Result<ProviderResponse, SendError> {
        debug!(
            to = request.to.len(),
            cc = request.cc.len(),
            bcc = request.bcc.len(),
            attachments = request.attachments.len(),
            "Sending email via SendGrid"
        );

        let response = self
            .client
            .post(format!(
                "{}/mail/send",
                self.config.api_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.config.api_key)
            .json(&SendGridRequest::from(request))
            .send()
            .await?;

        Ok(ProviderResponse::from_reqwest(response).await)
    }
}
