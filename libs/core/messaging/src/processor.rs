//! Processor trait for message handling.

use crate::error::ProcessingError;
use crate::message::Message;
use async_trait::async_trait;

/// Handles one decoded message taken off a topic.
///
/// Implementations are shared across concurrently running handlers, so they
/// must not hold mutable state beyond what their clients already synchronize.
///
/// # Error Handling
///
/// The returned category decides what the transport does next:
/// - `Transient` / `RateLimited`: nak with backoff, redelivered until the
///   topic's delivery limit, then dead-lettered
/// - `Permanent`: dead-lettered immediately
#[async_trait]
pub trait Processor<M: Message>: Send + Sync {
    async fn process(&self, message: &M) -> Result<(), ProcessingError>;

    /// Used for logging and metrics labels.
    fn name(&self) -> &'static str;

    /// Override to probe downstream dependencies for readiness.
    async fn health_check(&self) -> Result<bool, ProcessingError> {
        Ok(true)
    }
}
