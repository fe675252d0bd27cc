use core_config::server::ServerConfig;
use core_config::{app_info, env_optional, env_or_default, env_parse, env_required, AppInfo, ConfigError, FromEnv};
use dispatch::config::TwilioCredentials;
use std::time::Duration;

pub use core_config::Environment;

/// Token validation settings.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl FromEnv for AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            secret: env_required("JWT_SECRET")?,
            issuer: env_optional("JWT_ISSUER"),
            audience: env_optional("JWT_AUDIENCE"),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub nats_url: String,
    pub duplicate_window: Duration,
    /// Phone numbers are checked against Twilio Lookup when set, and by
    /// format only otherwise.
    pub twilio: Option<TwilioCredentials>,
    pub lookup_url: String,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            nats_url: env_or_default("NATS_URL", "nats://localhost:4222"),
            duplicate_window: Duration::from_secs(env_parse(
                "DOTFLYER_DUPLICATE_WINDOW_SECS",
                600u64,
            )?),
            twilio: TwilioCredentials::from_env_optional(),
            lookup_url: env_or_default("TWILIO_LOOKUP_URL", "https://lookups.twilio.com"),
        })
    }
}
