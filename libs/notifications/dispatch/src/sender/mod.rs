//! Senders turn a message into a provider call and record the outcome.
//!
//! Every sender follows the same order: check preconditions, build the
//! provider request, call the provider, ingest the outcome, and only then
//! decide whether the attempt succeeded.

mod email;
mod sms;

pub use email::EmailSender;
pub use sms::SmsSender;

use crate::error::SendError;
use crate::provider::ProviderResponse;
use crate::telemetry::{Telemetry, TelemetryEvent};
use async_trait::async_trait;
use http::StatusCode;
use tracing::debug;

#[async_trait]
pub trait Sender<M>: Send + Sync {
    async fn send(&self, message: &M) -> Result<(), SendError>;

    fn name(&self) -> &'static str;
}

/// `success` passes, 400 is a payload problem reported through telemetry,
/// anything else fails with the raw response body.
pub(crate) fn classify(
    response: ProviderResponse,
    success: StatusCode,
    rejected: TelemetryEvent,
    telemetry: &dyn Telemetry,
) -> Result<(), SendError> {
    match response.status {
        status if status == success => {
            debug!(status = %status, "Provider accepted message");
            Ok(())
        }
        StatusCode::BAD_REQUEST => {
            telemetry.track_event(rejected, &response.body);
            Ok(())
        }
        status => Err(SendError::Request {
            status,
            body: response.body,
            retry_after: response.retry_after,
        }),
    }
}
