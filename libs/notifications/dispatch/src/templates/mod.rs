//! HTML rendering for templated emails.
//!
//! Resolution order for a message:
//!
//! 1. No `TemplateId`: the plain `Body` is returned unchanged.
//! 2. `TemplateId` unknown: warning, then the serialized `TemplateModel`.
//! 3. Model does not fit the template, or rendering fails: logged, then the
//!    serialized `TemplateModel`.
//! 4. Otherwise: the template rendered inside the shared layout.
//!
//! Steps 2 and 3 mean a template problem never fails a send.

mod models;
mod registry;

pub use models::{ManualEntraAppSecretRotationModel, ManualSecretRotationModel, SalesReportModel};
pub use registry::TemplateKind;

use crate::blob::attachment_filename;
use crate::models::{Contact, EmailMessage};
use chrono::{Datelike, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

const LAYOUT: &str = "layout";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template registration failed: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("template rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("template model does not match: {0}")]
    Model(#[from] serde_json::Error),

    #[error("no template model provided")]
    MissingModel,
}

pub struct TemplateRenderer {
    handlebars: Handlebars<'static>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LayoutContext<'a> {
    subject: &'a str,
    content: String,
    has_details: bool,
    cc: &'a [Contact],
    attachments: Vec<AttachmentView<'a>>,
    tags: Vec<TagView<'a>>,
    year: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AttachmentView<'a> {
    name: &'a str,
    uri: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TagView<'a> {
    key: &'a str,
    value: &'a str,
}

impl TemplateRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars
            .register_template_string(LAYOUT, include_str!("hbs/layout.hbs"))
            .map_err(Box::new)?;
        for kind in TemplateKind::ALL {
            handlebars
                .register_template_string(kind.id(), kind.source())
                .map_err(Box::new)?;
        }

        Ok(Self { handlebars })
    }

    /// HTML content for `message`. `None` only when the message has neither
    /// a template nor a body.
    pub fn render(&self, message: &EmailMessage) -> Option<String> {
        let Some(template_id) = message.template_id.as_deref() else {
            return message.body.clone();
        };

        let Some(kind) = TemplateKind::from_id(template_id) else {
            warn!(template_id, "Template not registered, falling back to serialized model");
            return Some(fallback(message));
        };

        match self.render_kind(kind, message) {
            Ok(html) => {
                debug!(template_id, "Template rendered");
                Some(html)
            }
            Err(e) => {
                error!(template_id, error = %e, "Template rendering failed, falling back to serialized model");
                Some(fallback(message))
            }
        }
    }

    fn render_kind(&self, kind: TemplateKind, message: &EmailMessage) -> Result<String, RenderError> {
        let model = message.template_model.as_ref().ok_or(RenderError::MissingModel)?;
        let content = self.handlebars.render(kind.id(), &kind.context(model)?)?;

        let attachments: Vec<AttachmentView<'_>> = message
            .attachments()
            .iter()
            .map(|uri| AttachmentView {
                name: attachment_filename(uri),
                uri,
            })
            .collect();
        let tags: Vec<TagView<'_>> = message
            .tags
            .iter()
            .flatten()
            .map(|(key, value)| TagView { key, value })
            .collect();

        let layout = LayoutContext {
            subject: &message.subject,
            content,
            has_details: !message.cc().is_empty() || !attachments.is_empty() || !tags.is_empty(),
            cc: message.cc(),
            attachments,
            tags,
            year: Utc::now().year(),
        };

        Ok(self.handlebars.render(LAYOUT, &layout)?)
    }
}

/// Last-resort content: the model as JSON, or the body when there is no model.
fn fallback(message: &EmailMessage) -> String {
    match &message.template_model {
        Some(model) => model.to_string(),
        None => message.body.clone().unwrap_or_default(),
    }
}
