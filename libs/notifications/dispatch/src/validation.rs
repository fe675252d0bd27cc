//! Payload validation.
//!
//! Every rule runs; failures are grouped by wire field name (`To`,
//! `From.Email`, `Cc[1].Name`, ...) rather than stopping at the first one.

use crate::lookup::PhoneNumberLookup;
use crate::models::{Contact, EmailMessage, SmsMessage};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors, ValidationErrorsKind};

pub const PHONE_FORMAT_MESSAGE: &str =
    "'To' field should be a valid phone number in E.164 format";
pub const CONTENT_REQUIRED_MESSAGE: &str = "Either 'Body' or 'TemplateModel' must be provided.";
pub const TO_CONTACTS_REQUIRED_MESSAGE: &str =
    "'To' field is required and should contain at least one contact";

static SMS_SENDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\+[1-9]\d{1,14}|[A-Za-z0-9]{1,11})$").expect("sender pattern is valid")
});

/// Validation failures keyed by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[serde(transparent)]
#[error("request validation failed")]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Every message, across all fields.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.0.values().flatten().map(String::as_str)
    }

    pub fn contains_message(&self, message: &str) -> bool {
        self.messages().any(|m| m == message)
    }

    /// Merge errors produced by a `validator` derive, translating field
    /// paths to wire names.
    pub fn extend_from(&mut self, errors: &ValidationErrors) {
        self.extend_prefixed(None, errors);
    }

    fn extend_prefixed(&mut self, prefix: Option<&str>, errors: &ValidationErrors) {
        for (field, kind) in errors.errors() {
            let name = wire_name(field);
            let path = match prefix {
                Some(prefix) => format!("{prefix}.{name}"),
                None => name,
            };

            match kind {
                ValidationErrorsKind::Field(field_errors) => {
                    for error in field_errors {
                        let message = error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("'{}' field is invalid", wire_name(field)));
                        self.add(path.clone(), message);
                    }
                }
                ValidationErrorsKind::Struct(nested) => {
                    self.extend_prefixed(Some(&path), nested);
                }
                ValidationErrorsKind::List(items) => {
                    for (index, nested) in items {
                        self.extend_prefixed(Some(&format!("{path}[{index}]")), nested);
                    }
                }
            }
        }
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

/// `template_model` -> `TemplateModel`
fn wire_name(field: &str) -> String {
    field
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Rejects empty and whitespace-only text. Callers supply the message.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required"))
    } else {
        Ok(())
    }
}

pub fn validate_contact_email(email: &str) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(rule("required", "'Email' field is required"));
    }
    if !email.validate_email() {
        return Err(rule(
            "email",
            "'Email' field should be a valid email address",
        ));
    }
    Ok(())
}

pub fn validate_sms_sender(from: &str) -> Result<(), ValidationError> {
    if SMS_SENDER.is_match(from) {
        Ok(())
    } else {
        Err(rule(
            "sender",
            "'From' field should be an E.164 phone number or alphanumeric sender id",
        ))
    }
}

fn validate_contacts(field: &str, contacts: &[Contact], errors: &mut FieldErrors) {
    for (index, contact) in contacts.iter().enumerate() {
        if let Err(e) = contact.validate() {
            errors.extend_prefixed(Some(&format!("{field}[{index}]")), &e);
        }
    }
}

pub fn validate_email_message(message: &EmailMessage) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if let Err(e) = message.validate() {
        errors.extend_from(&e);
    }

    if !message.has_content() {
        errors.add("Body", CONTENT_REQUIRED_MESSAGE);
    }

    if message.to.is_empty() {
        errors.add("To", TO_CONTACTS_REQUIRED_MESSAGE);
    }

    validate_contacts("To", &message.to, &mut errors);
    validate_contacts("Cc", message.cc(), &mut errors);
    validate_contacts("Bcc", message.bcc(), &mut errors);

    errors.into_result()
}

/// The phone number check goes through `lookup`, which may call out to
/// the provider.
pub async fn validate_sms_message(
    message: &SmsMessage,
    lookup: &dyn PhoneNumberLookup,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if let Err(e) = message.validate() {
        errors.extend_from(&e);
    }

    if message.to.trim().is_empty() {
        errors.add("To", "'To' field is required");
    } else if !lookup.is_valid(&message.to).await {
        errors.add("To", PHONE_FORMAT_MESSAGE);
    }

    errors.into_result()
}
