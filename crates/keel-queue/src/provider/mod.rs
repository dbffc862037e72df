//! Message queue provider facade.
//!
//! [`MessageQueueProvider`] is the surface other subsystems (loggers, domain
//! event publishers, cache invalidation) talk to. Requests arrive as parameter
//! objects and are translated into [`InternalQueueManager`] calls.
//!
//! ## Policy
//!
//! - Enqueue and consume targeting an unknown queue create it when
//!   [`QueueConfig::auto_create_internal_queue`] is set, and fail with
//!   [`Error::QueueNotFound`] otherwise.
//! - Enqueue resolves every target before writing anything, so a missing
//!   queue never results in a partial fan-out.
//!
//! [`QueueConfig::auto_create_internal_queue`]: crate::QueueConfig::auto_create_internal_queue

mod options;

pub use options::*;

use crate::{Error, InternalQueue, InternalQueueManager, Result};
use async_trait::async_trait;
use std::{collections::HashSet, sync::Arc};

/// External operation surface of the message queue subsystem.
#[async_trait]
pub trait MessageQueueProvider: Send + Sync {
    /// Creates the named queues (idempotent).
    async fn add_queue(&self, options: AddQueueOptions) -> Result<()>;

    /// Releases and removes queues. Returns how many were removed.
    async fn delete_queue(&self, options: DeleteQueueOptions) -> Result<usize>;

    /// Writes every message to every target queue. Returns the total number of
    /// accepted writes.
    async fn enqueue(&self, options: EnqueueOptions) -> Result<usize>;

    /// Starts consumers on a queue. Returns its consumer count afterwards.
    async fn consume(&self, options: ConsumeOptions) -> Result<usize>;

    /// Stops consumers. Returns how many queues were affected.
    async fn abort_consume(&self, options: AbortConsumeOptions) -> Result<usize>;
}

/// [`MessageQueueProvider`] backed by an in-process [`InternalQueueManager`].
#[derive(Clone)]
pub struct InternalQueueProvider {
    manager: Arc<InternalQueueManager>,
}

impl InternalQueueProvider {
    pub const fn new(manager: Arc<InternalQueueManager>) -> Self {
        Self { manager }
    }

    pub const fn manager(&self) -> &Arc<InternalQueueManager> {
        &self.manager
    }

    /// Looks up a queue, creating it if the configuration allows.
    fn resolve(&self, name: &str) -> Result<Arc<InternalQueue>> {
        if name.is_empty() {
            return Err(Error::invalid("queue name must not be empty"));
        }
        if let Some(queue) = self.manager.get_queue(name) {
            return Ok(queue);
        }
        if self.manager.config().auto_create_internal_queue {
            return self.manager.add_queue(name);
        }
        Err(Error::QueueNotFound {
            name: name.to_owned(),
        })
    }
}

#[async_trait]
impl MessageQueueProvider for InternalQueueProvider {
    async fn add_queue(&self, options: AddQueueOptions) -> Result<()> {
        if options.names.is_empty() {
            return Err(Error::invalid("no queue names given"));
        }
        self.manager.add_queues(&options.names).map(|_| ())
    }

    async fn delete_queue(&self, options: DeleteQueueOptions) -> Result<usize> {
        let removed = match options.scope {
            QueueScope::All => self.manager.delete_all_queues(),
            QueueScope::Named(names) => self.manager.delete_queue(&names),
        };
        Ok(removed)
    }

    async fn enqueue(&self, options: EnqueueOptions) -> Result<usize> {
        if options.queues.is_empty() {
            return Err(Error::invalid("no target queues given"));
        }

        let mut seen = HashSet::new();
        let targets = options
            .queues
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .map(|name| self.resolve(name))
            .collect::<Result<Vec<_>>>()?;

        let accepted = targets
            .iter()
            .map(|queue| queue.enqueue(options.messages.iter().cloned()))
            .sum();
        Ok(accepted)
    }

    async fn consume(&self, options: ConsumeOptions) -> Result<usize> {
        if options.consumers == 0 {
            return Err(Error::invalid("consumer count must be positive"));
        }
        let queue = self.resolve(&options.queue)?;
        Ok(queue.consume(options.consumers))
    }

    async fn abort_consume(&self, options: AbortConsumeOptions) -> Result<usize> {
        let affected = match options.scope {
            QueueScope::All => self.manager.abort_all_consume(),
            QueueScope::Named(names) => self.manager.abort_consume(&names),
        };
        Ok(affected)
    }
}
