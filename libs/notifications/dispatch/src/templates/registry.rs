//! Static registry: template identifier to template kind.

use super::models::{ManualEntraAppSecretRotationModel, ManualSecretRotationModel, SalesReportModel};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    ManualSecretRotation,
    ManualEntraAppSecretRotation,
    SalesReport,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 3] = [
        TemplateKind::ManualSecretRotation,
        TemplateKind::ManualEntraAppSecretRotation,
        TemplateKind::SalesReport,
    ];

    /// Identifier clients put in `TemplateId`.
    pub fn id(&self) -> &'static str {
        match self {
            TemplateKind::ManualSecretRotation => "ManualSecretRotationModel",
            TemplateKind::ManualEntraAppSecretRotation => "ManualEntraAppSecretRotationModel",
            TemplateKind::SalesReport => "SalesReportModel",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub(super) fn source(&self) -> &'static str {
        match self {
            TemplateKind::ManualSecretRotation => {
                include_str!("hbs/manual_secret_rotation.hbs")
            }
            TemplateKind::ManualEntraAppSecretRotation => {
                include_str!("hbs/manual_entra_app_secret_rotation.hbs")
            }
            TemplateKind::SalesReport => include_str!("hbs/sales_report.hbs"),
        }
    }

    /// Body context for this kind. Fails when `model` does not have the
    /// kind's shape.
    pub(super) fn context(&self, model: &Value) -> serde_json::Result<Value> {
        match self {
            TemplateKind::ManualSecretRotation => {
                let model: ManualSecretRotationModel = serde_json::from_value(model.clone())?;
                Ok(json!({
                    "DeletionDate": deletion_date(&model.old_secret_deletion_date_utc),
                    "Model": model,
                }))
            }
            TemplateKind::ManualEntraAppSecretRotation => {
                let model: ManualEntraAppSecretRotationModel =
                    serde_json::from_value(model.clone())?;
                Ok(json!({
                    "DeletionDate": deletion_date(&model.rotation.old_secret_deletion_date_utc),
                    "Model": model,
                }))
            }
            TemplateKind::SalesReport => {
                let model: SalesReportModel = serde_json::from_value(model.clone())?;
                Ok(json!({ "Model": model }))
            }
        }
    }
}

fn deletion_date(date: &DateTime<Utc>) -> String {
    date.format("%B %-d, %Y %H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_resolve_back() {
        for kind in TemplateKind::ALL {
            assert_eq!(TemplateKind::from_id(kind.id()), Some(kind));
        }
        assert_eq!(TemplateKind::from_id("manualsecretrotationmodel"), None);
        assert_eq!(TemplateKind::from_id("UnknownModel"), None);
    }

    #[test]
    fn test_context_formats_deletion_date() {
        let context = TemplateKind::ManualSecretRotation
            .context(&json!({
                "ResourceName": "payments-api",
                "KeyVaults": ["kv-prod-eu"],
                "SecretName": "db-password",
                "OldSecretDeletionDateUtc": "2024-06-01T09:30:00Z"
            }))
            .unwrap();

        assert_eq!(context["DeletionDate"], "June 1, 2024 09:30 UTC");
        assert_eq!(context["Model"]["PwPushUrl"], Value::Null);
    }
}
