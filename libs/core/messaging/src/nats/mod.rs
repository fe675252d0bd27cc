//! NATS JetStream backend for topics.
//!
//! A topic is one JetStream stream bound to a single subject. Publishers tag
//! messages with an optional `Nats-Msg-Id`; the stream's duplicate window
//! drops repeats, which is the only idempotency mechanism in the pipeline.
//! Consumers are durable pull consumers shared by every worker replica, so
//! each message is handled by exactly one of them.
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging::nats::{Topic, TopicConfig, TopicConsumer, TopicPublisher, Publisher};
//!
//! struct PingTopic;
//!
//! impl Topic for PingTopic {
//!     type Message = Ping;
//!     const STREAM_NAME: &'static str = "PINGS";
//!     const SUBJECT: &'static str = "pings.send";
//!     const CONSUMER_NAME: &'static str = "ping-processor";
//!     const DLQ_STREAM: &'static str = "PINGS_DLQ";
//! }
//!
//! let publisher = TopicPublisher::<Ping>::new(jetstream.clone(), TopicConfig::from_topic::<PingTopic>());
//! publisher.publish(&ping, Some("request-42")).await?;
//!
//! let consumer = TopicConsumer::new(jetstream, processor, TopicConfig::from_topic::<PingTopic>());
//! consumer.run(shutdown_rx).await?;
//! ```

mod consumer;
mod dead_letter;
mod error;
mod health;
pub mod metrics;
mod publisher;
mod subscription;
mod topic;

pub use consumer::{ConsumerState, TopicConsumer};
pub use dead_letter::{DeadLetter, DeadLetterQueue};
pub use error::TopicError;
pub use health::{HealthServer, HealthState};
pub use metrics::{init_metrics, ConsumerMetrics};
pub use publisher::{PublishReceipt, Publisher, TopicPublisher};
pub use subscription::{Delivery, TopicSubscription};
pub use topic::{Topic, TopicConfig};
