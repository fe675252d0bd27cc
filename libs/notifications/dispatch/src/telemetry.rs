//! Data-quality events raised when a provider rejects a payload.

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    InvalidSmsPayload,
    InvalidEmailPayload,
}

impl TelemetryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryEvent::InvalidSmsPayload => "InvalidSMSPayload",
            TelemetryEvent::InvalidEmailPayload => "InvalidEmailPayload",
        }
    }

    pub fn channel(&self) -> &'static str {
        match self {
            TelemetryEvent::InvalidSmsPayload => "sms",
            TelemetryEvent::InvalidEmailPayload => "email",
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Telemetry: Send + Sync {
    /// Record `event` with the provider's explanation.
    fn track_event(&self, event: TelemetryEvent, message: &str);
}

/// Logs the event and counts it in `dotflyer_invalid_payload_total`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsTelemetry;

impl Telemetry for MetricsTelemetry {
    fn track_event(&self, event: TelemetryEvent, message: &str) {
        warn!(event = event.name(), provider_message = %message, "Provider rejected payload");
        metrics::counter!("dotflyer_invalid_payload_total", "channel" => event.channel())
            .increment(1);
    }
}
