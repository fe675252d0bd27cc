use core_config::{
    app_info, env_or_default, env_parse, AppInfo, ConfigError, Environment, FromEnv,
};
use dispatch::config::{BlobConfig, KustoConfig, SendGridConfig, TemplatesConfig, TwilioConfig};
use std::time::Duration;

/// Consumer tuning shared by both topics.
#[derive(Clone, Debug)]
pub struct ConsumerSettings {
    pub duplicate_window: Duration,
    pub max_concurrent: usize,
    pub drain_timeout: Duration,
}

impl FromEnv for ConsumerSettings {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            duplicate_window: Duration::from_secs(env_parse(
                "DOTFLYER_DUPLICATE_WINDOW_SECS",
                600u64,
            )?),
            max_concurrent: env_parse("DOTFLYER_MAX_CONCURRENT", 8usize)?,
            drain_timeout: Duration::from_secs(env_parse("DOTFLYER_DRAIN_TIMEOUT_SECS", 30u64)?),
        })
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub nats_url: String,
    pub health_port: u16,
    pub consumers: ConsumerSettings,
    pub twilio: TwilioConfig,
    pub sendgrid: SendGridConfig,
    pub templates: TemplatesConfig,
    pub blobs: BlobConfig,
    /// Outcome records are only logged when unset.
    pub kusto: Option<KustoConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            app: app_info!(),
            environment: Environment::from_env(),
            nats_url: env_or_default("NATS_URL", "nats://localhost:4222"),
            health_port: env_parse("HEALTH_PORT", 8081u16)?,
            consumers: ConsumerSettings::from_env()?,
            twilio: TwilioConfig::from_env()?,
            sendgrid: SendGridConfig::from_env()?,
            templates: TemplatesConfig::from_env()?,
            blobs: BlobConfig::from_env()?,
            kusto: KustoConfig::from_env_optional(),
        })
    }
}
