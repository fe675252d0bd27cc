//! Shared test utilities for the dispatch pipeline
//!
//! - `TestNats`: NATS container with JetStream and automatic cleanup (feature: "nats")
//! - `TestDataBuilder`: Deterministic recipients, namespaces and dedup keys (always available)
//!
//! # Features
//!
//! - `nats`: Enables JetStream test infrastructure
//!
//! # Usage
//!
//! Add `features = ["nats"]` to your dev-dependencies:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { workspace = true, features = ["nats"] }
//! ```
//!
//! Then in your tests:
//!
//! ```rust,ignore
//! use test_utils::{TestDataBuilder, TestNats};
//!
//! #[tokio::test]
//! #[ignore = "requires docker"]
//! async fn my_topic_test() {
//!     let nats = TestNats::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_topic_test");
//!
//!     let config = TopicConfig::from_topic::<SmsTopic>().with_namespace(&builder.namespace());
//!     let publisher = TopicPublisher::new(nats.jetstream(), config);
//! }
//! ```

#[cfg(feature = "nats")]
mod nats;

#[cfg(feature = "nats")]
pub use nats::TestNats;

/// Builder for test data with deterministic randomization
///
/// Tests sharing one NATS server stay isolated as long as each uses the
/// namespace derived from its own name.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_sms_dedup");
    /// assert!(builder.namespace().starts_with('t'));
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Namespace for streams, subjects and consumers (alphanumeric only).
    pub fn namespace(&self) -> String {
        format!("t{:x}", self.seed)
    }

    /// E.164 phone number, stable for a given seed.
    pub fn phone_number(&self) -> String {
        format!("+1555{:07}", self.seed % 10_000_000)
    }

    pub fn email(&self, local: &str) -> String {
        format!("{local}.{:x}@example.com", self.seed & 0xffff)
    }

    /// Deduplication key, unique per test and suffix.
    pub fn dedup_key(&self, suffix: &str) -> String {
        format!("msg-{}-{suffix}", self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::from_test_name("my_test");
        let builder2 = TestDataBuilder::from_test_name("my_test");

        assert_eq!(builder1.namespace(), builder2.namespace());
        assert_eq!(builder1.dedup_key("a"), builder2.dedup_key("a"));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.namespace(), builder2.namespace());
    }

    #[test]
    fn test_phone_number_is_e164() {
        let phone = TestDataBuilder::new(42).phone_number();
        assert_eq!(phone, "+15550000042");
        assert!(phone.len() <= 16);
    }

    #[test]
    fn test_namespace_is_alphanumeric() {
        let ns = TestDataBuilder::new(u64::MAX).namespace();
        assert!(ns.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
