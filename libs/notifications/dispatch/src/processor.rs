//! Adapter running a [`Sender`] as a topic [`Processor`].

use crate::sender::Sender;
use async_trait::async_trait;
use messaging::{Message, ProcessingError, Processor};
use std::time::Instant;
use tracing::{debug, instrument};

pub struct DispatchProcessor<S> {
    sender: S,
}

impl<S> DispatchProcessor<S> {
    pub fn new(sender: S) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl<M, S> Processor<M> for DispatchProcessor<S>
where
    M: Message,
    S: Sender<M>,
{
    #[instrument(skip_all, fields(kind = M::KIND, sender = self.sender.name()))]
    async fn process(&self, message: &M) -> Result<(), ProcessingError> {
        let started = Instant::now();
        self.sender.send(message).await?;
        debug!(
            recipients = %message.recipients(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Message dispatched"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.sender.name()
    }
}
