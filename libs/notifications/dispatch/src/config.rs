//! Provider, storage and template settings.
//!
//! Each struct is loaded once at startup through [`FromEnv`] and handed to
//! the component that needs it; nothing below reads the environment later.

use core_config::{env_optional, env_or_default, env_parse, env_required, ConfigError, FromEnv};

/// Twilio account credentials, shared by the SMS gateway and phone lookup.
#[derive(Clone, Debug)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub api_key_sid: String,
    pub api_key_secret: String,
}

impl TwilioCredentials {
    /// `None` unless all three variables are set.
    pub fn from_env_optional() -> Option<Self> {
        Some(Self {
            account_sid: env_optional("TWILIO_ACCOUNT_SID")?,
            api_key_sid: env_optional("TWILIO_API_KEY_SID")?,
            api_key_secret: env_optional("TWILIO_API_KEY_SECRET")?,
        })
    }
}

impl FromEnv for TwilioCredentials {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            account_sid: env_required("TWILIO_ACCOUNT_SID")?,
            api_key_sid: env_required("TWILIO_API_KEY_SID")?,
            api_key_secret: env_required("TWILIO_API_KEY_SECRET")?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub credentials: TwilioCredentials,
    /// Sender used when a message does not override `From`
    pub from_phone_number: String,
    pub api_url: String,
    pub lookup_url: String,
}

impl FromEnv for TwilioConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            credentials: TwilioCredentials::from_env()?,
            from_phone_number: env_required("TWILIO_FROM_PHONE_NUMBER")?,
            api_url: env_or_default("TWILIO_API_URL", "https://api.twilio.com"),
            lookup_url: env_or_default("TWILIO_LOOKUP_URL", "https://lookups.twilio.com"),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SendGridConfig {
    pub api_key: String,
    pub api_url: String,
}

impl FromEnv for SendGridConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("SENDGRID_API_KEY")?,
            api_url: env_or_default("SENDGRID_API_URL", "https://api.sendgrid.com/v3"),
        })
    }
}

/// Analytical store connection. Absent means outcomes are only logged.
#[derive(Clone, Debug)]
pub struct KustoConfig {
    pub cluster_url: String,
    pub database: String,
    pub access_token: String,
}

impl KustoConfig {
    pub fn from_env_optional() -> Option<Self> {
        Some(Self {
            cluster_url: env_optional("KUSTO_CLUSTER_URL")?,
            database: env_optional("KUSTO_DATABASE")?,
            access_token: env_optional("KUSTO_ACCESS_TOKEN")?,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct BlobConfig {
    /// Bearer token sent with attachment downloads
    pub access_token: Option<String>,
}

impl FromEnv for BlobConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            access_token: env_optional("BLOB_ACCESS_TOKEN"),
        })
    }
}

#[derive(Clone, Debug)]
pub struct TemplatesConfig {
    pub enabled: bool,
}

impl FromEnv for TemplatesConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: env_parse("DOTFLYER_TEMPLATES_ENABLED", true)?,
        })
    }
}
