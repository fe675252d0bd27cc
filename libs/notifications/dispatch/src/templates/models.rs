//! Typed render inputs. An untyped `TemplateModel` must deserialize into
//! one of these before its template is rendered.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManualSecretRotationModel {
    pub resource_name: String,
    pub key_vaults: Vec<String>,
    pub secret_name: String,
    #[serde(default, deserialize_with = "utc_or_naive")]
    pub old_secret_deletion_date_utc: DateTime<Utc>,
    #[serde(default)]
    pub pw_push_url: Option<String>,
    #[serde(default)]
    pub pw_push_expires_in_days: i32,
    #[serde(default)]
    pub pw_push_expires_after_views: i32,
}

/// Rotation of an Entra application (service principal) secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ManualEntraAppSecretRotationModel {
    #[serde(flatten)]
    pub rotation: ManualSecretRotationModel,
    pub tenant_id: String,
    pub app_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SalesReportModel {
    pub title: String,
    pub client_name: String,
    pub contact_email_address: String,
}

/// Accepts RFC 3339 timestamps as well as offset-less ones, which are read
/// as UTC.
fn utc_or_naive<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(value) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(value.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}
