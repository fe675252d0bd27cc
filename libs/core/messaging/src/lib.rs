//! Messaging abstractions for topic-based dispatch.
//!
//! The crate is split in two layers:
//! - **Core traits** (always available): [`Message`] for payloads,
//!   [`Processor`] for the code that handles them, and the categorised
//!   [`ProcessingError`] that tells the transport what to do on failure.
//! - **NATS JetStream backend** (feature `nats`): a topic publisher with
//!   transport-level deduplication and a topic consumer that drives a
//!   processor through an explicit lifecycle.
//!
//! ```text
//! ┌──────────────────┐  Nats-Msg-Id  ┌─────────────────────┐  pull   ┌──────────────────┐
//! │  TopicPublisher  │──────────────▶│  JetStream stream   │────────▶│  TopicConsumer   │
//! │ (HTTP gateway)   │               │ (duplicate window)  │         │  Idle→…→Stopped  │
//! └──────────────────┘               └─────────────────────┘         └────────┬─────────┘
//!                                              ▲                              │
//!                                              │ term + copy                  ▼
//!                                    ┌─────────────────────┐         ┌──────────────────┐
//!                                    │  dead-letter stream │◀────────│  Processor<M>    │
//!                                    └─────────────────────┘         └──────────────────┘
//! ```

mod error;
mod message;
mod processor;

#[cfg(feature = "nats")]
pub mod nats;

pub use error::{ErrorCategory, ProcessingError};
pub use message::Message;
pub use processor::Processor;
