//! Message trait for topic payloads.

use serde::{de::DeserializeOwned, Serialize};

/// A payload that travels over a topic.
///
/// Messages are immutable values: the publisher serializes a copy and the
/// consumer deserializes its own, so nothing is shared between the two sides.
///
/// # Example
///
/// ```rust
/// use messaging::Message;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Ping {
///     to: String,
/// }
///
/// impl Message for Ping {
///     const KIND: &'static str = "ping";
///
///     fn recipients(&self) -> String {
///         self.to.clone()
///     }
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Short label used in logs and metrics (e.g. "sms", "email").
    const KIND: &'static str;

    /// Recipient summary for log lines. Must not include message content.
    fn recipients(&self) -> String;
}
