//! Flat outcome records, one per send attempt.
//!
//! A record is built from a message and the provider response; it never
//! borrows the message type's shape. Collections are pre-serialized to JSON
//! strings, and an absent collection is stored as `[]` or `{}`.

use crate::models::{EmailMessage, SmsMessage, Tags};
use crate::provider::ProviderResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailOutcome {
    pub ingest_date_time_utc: DateTime<Utc>,
    pub status_code: u16,
    pub status: String,
    pub response_content: String,
    pub from_email: String,
    pub from_name: String,
    pub to: String,
    pub cc: String,
    pub bcc: String,
    pub subject: String,
    pub body: String,
    pub attachments: String,
    pub tags: String,
    pub template_id: String,
}

#[derive(Serialize)]
struct AttachmentRef<'a> {
    #[serde(rename = "URI")]
    uri: &'a str,
}

impl EmailOutcome {
    /// `html` is the rendered content, stored in place of `Body` when
    /// non-empty.
    pub fn new(message: &EmailMessage, html: Option<&str>, response: &ProviderResponse) -> Self {
        let body = match html {
            Some(html) if !html.is_empty() => html.to_string(),
            _ => message.body.clone().unwrap_or_default(),
        };
        let attachments: Vec<AttachmentRef<'_>> = message
            .attachments()
            .iter()
            .map(|uri| AttachmentRef { uri })
            .collect();

        Self {
            ingest_date_time_utc: Utc::now(),
            status_code: response.status.as_u16(),
            status: response.status_text().to_string(),
            response_content: response.body.clone(),
            from_email: message.from.email.clone(),
            from_name: message.from.name.clone(),
            to: to_json(&message.to),
            cc: to_json(message.cc()),
            bcc: to_json(message.bcc()),
            subject: message.subject.clone(),
            body,
            attachments: to_json(&attachments),
            tags: tags_json(message.tags.as_ref()),
            template_id: message.template_id.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SmsOutcome {
    pub ingest_date_time_utc: DateTime<Utc>,
    pub status_code: u16,
    pub status: String,
    pub response_content: String,
    /// Sender actually used, after applying the configured default
    pub from: String,
    pub to: String,
    pub body: String,
    pub tags: String,
}

impl SmsOutcome {
    pub fn new(message: &SmsMessage, from: &str, response: &ProviderResponse) -> Self {
        Self {
            ingest_date_time_utc: Utc::now(),
            status_code: response.status.as_u16(),
            status: response.status_text().to_string(),
            response_content: response.body.clone(),
            from: from.to_string(),
            to: message.to.clone(),
            body: message.body.clone(),
            tags: tags_json(message.tags.as_ref()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutcomeRecord {
    Email(EmailOutcome),
    Sms(SmsOutcome),
}

impl OutcomeRecord {
    pub fn channel(&self) -> &'static str {
        match self {
            OutcomeRecord::Email(_) => "email",
            OutcomeRecord::Sms(_) => "sms",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            OutcomeRecord::Email(record) => record.status_code,
            OutcomeRecord::Sms(record) => record.status_code,
        }
    }

    /// One JSON document, as ingested.
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            OutcomeRecord::Email(record) => serde_json::to_string(record),
            OutcomeRecord::Sms(record) => serde_json::to_string(record),
        }
    }
}

impl From<EmailOutcome> for OutcomeRecord {
    fn from(record: EmailOutcome) -> Self {
        OutcomeRecord::Email(record)
    }
}

impl From<SmsOutcome> for OutcomeRecord {
    fn from(record: SmsOutcome) -> Self {
        OutcomeRecord::Sms(record)
    }
}

// Serializing plain strings and string maps cannot fail.
fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "[]".to_string())
}

fn tags_json(tags: Option<&Tags>) -> String {
    tags.map(|tags| serde_json::to_string(tags).unwrap_or_else(|_| "{}".to_string()))
        .unwrap_or_else(|| "{}".to_string())
}
