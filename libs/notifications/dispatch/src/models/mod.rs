//! Wire payloads accepted by the gateway and carried over topics.
//!
//! Field names are PascalCase on the wire. Required fields still default
//! when absent so that validation, not deserialization, reports them.

use messaging::Message;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

use crate::validation::{not_blank, validate_contact_email, validate_sms_sender};

/// Free-form metadata attached to a message.
pub type Tags = BTreeMap<String, String>;

/// Explicit `null` reads as the field's default, same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct Contact {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "validate_contact_email"))]
    pub email: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank", message = "'Name' field is required"))]
    pub name: String,
}

impl Contact {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct EmailMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(nested)]
    pub from: Contact,

    #[serde(default, deserialize_with = "null_as_default")]
    pub to: Vec<Contact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<Contact>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bcc: Option<Vec<Contact>>,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank", message = "'Subject' field is required"))]
    pub subject: String,

    /// Plain-text content, and the HTML fallback when no template applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,

    /// Untyped render input. Resolved against the template's model shape
    /// at render time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_model: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

impl EmailMessage {
    /// At least one content source must exist: a non-empty body, or a
    /// template model that is structured (not a bare string or null).
    pub fn has_content(&self) -> bool {
        let has_body = self.body.as_deref().is_some_and(|body| !body.is_empty());
        let has_model = self
            .template_model
            .as_ref()
            .is_some_and(|model| !model.is_null() && !model.is_string());
        has_body || has_model
    }

    pub fn cc(&self) -> &[Contact] {
        self.cc.as_deref().unwrap_or_default()
    }

    pub fn bcc(&self) -> &[Contact] {
        self.bcc.as_deref().unwrap_or_default()
    }

    pub fn attachments(&self) -> &[String] {
        self.attachments.as_deref().unwrap_or_default()
    }
}

impl Message for EmailMessage {
    const KIND: &'static str = "email";

    fn recipients(&self) -> String {
        self.to
            .iter()
            .map(|contact| contact.email.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "PascalCase")]
pub struct SmsMessage {
    /// Overrides the configured sender number or id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_sms_sender"))]
    pub from: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub to: String,

    #[serde(default, deserialize_with = "null_as_default")]
    #[validate(custom(function = "not_blank", message = "'Body' field is required"))]
    pub body: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Tags>,
}

impl Message for SmsMessage {
    const KIND: &'static str = "sms";

    fn recipients(&self) -> String {
        self.to.clone()
    }
}
