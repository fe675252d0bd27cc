//! DotFlyer notification dispatch.
//!
//! Payload models and validation shared by the HTTP gateway and the worker,
//! plus everything the worker needs to deliver a message: provider clients,
//! senders, the template renderer and outcome ingestion.
//!
//! ```text
//! SmsMessage   ──▶ SmsSender   ──▶ TwilioGateway   ─┐
//!                                                   ├─▶ IngestionSink (outcome record)
//! EmailMessage ──▶ EmailSender ──▶ SendGridGateway ─┘
//!                    │   ▲
//!                    │   └── TemplateRenderer
//!                    └────── BlobStore (attachments)
//! ```

pub mod blob;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod lookup;
pub mod models;
pub mod processor;
pub mod provider;
pub mod sender;
pub mod telemetry;
pub mod templates;
pub mod topics;
pub mod validation;

pub use error::SendError;
pub use models::{Contact, EmailMessage, SmsMessage, Tags};
pub use processor::DispatchProcessor;
pub use sender::{EmailSender, Sender, SmsSender};
pub use topics::{EmailTopic, SmsTopic};
pub use validation::{validate_email_message, validate_sms_message, FieldErrors};
