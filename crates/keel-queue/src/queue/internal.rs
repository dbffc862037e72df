//! A single named, in-process work queue.
//!
//! Each [`InternalQueue`] wraps an unbounded Tokio MPSC channel. Producers
//! write without blocking; any number of consumer tasks share the receiving
//! end and execute messages as they arrive. Consumers are scaled up with
//! [`InternalQueue::consume`] and stopped together through a shared
//! [`CancellationToken`].
//!
//! Nothing is persisted: messages still in the channel when the queue is
//! released or the process exits are lost.

use crate::{
    SharedMessage,
    queue::{
        consumer::{Consumer, SharedReceiver, consumer_loop},
        stats::{QueueStats, QueueStatsSnapshot},
    },
};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Lifecycle of an [`InternalQueue`].
///
/// `Consuming` and `Cancelled` may alternate any number of times; `Released`
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// No consumer has been started yet.
    Created,
    /// At least one consumer is active.
    Consuming,
    /// Consumers were aborted; those still finishing a message exit after it.
    Cancelled,
    /// The writer is complete; enqueues are rejected.
    Released,
}

/// Consumer bookkeeping, guarded by one lock so concurrent `consume`,
/// `abort_consume` and `release` calls serialize.
#[derive(Debug, Default)]
struct Consumers {
    count: usize,
    token: Option<CancellationToken>,
    next_id: usize,
    aborted: bool,
}

/// An unbounded, multi-consumer, in-process message queue.
pub struct InternalQueue {
    name: Arc<str>,
    sender: RwLock<Option<mpsc::UnboundedSender<SharedMessage>>>,
    receiver: SharedReceiver,
    consumers: Mutex<Consumers>,
    tracker: TaskTracker,
    stats: Arc<QueueStats>,
}

impl InternalQueue {
    /// Creates an idle queue with no consumers.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            name: name.into(),
            sender: RwLock::new(Some(tx)),
            receiver: Arc::new(tokio::sync::Mutex::new(rx)),
            consumers: Mutex::new(Consumers::default()),
            tracker: TaskTracker::new(),
            stats: Arc::new(QueueStats::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Writes `messages` to the channel without blocking.
    ///
    /// Never fails: if the queue has been released, the messages are dropped
    /// and a warning is logged. Returns how many messages were accepted.
    pub fn enqueue<I>(&self, messages: I) -> usize
    where
        I: IntoIterator<Item = SharedMessage>,
    {
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            let dropped = messages.into_iter().count();
            self.stats.record_rejected(dropped as u64);
            tracing::warn!(
                queue = %self.name,
                dropped,
                "Enqueue on released queue, messages dropped"
            );
            return 0;
        };

        let mut accepted = 0;
        for message in messages {
            let name = message.name();
            match sender.send(message) {
                Ok(()) => {
                    self.stats.record_enqueued();
                    accepted += 1;
                    tracing::trace!(queue = %self.name, message = name, "Message enqueued");
                }
                Err(_) => {
                    self.stats.record_rejected(1);
                    tracing::warn!(
                        queue = %self.name,
                        message = name,
                        "Channel closed, message dropped"
                    );
                }
            }
        }
        accepted
    }

    /// Enqueues a single message. See [`Self::enqueue`].
    pub fn enqueue_one(&self, message: SharedMessage) -> bool {
        self.enqueue([message]) == 1
    }

    /// Starts `count` additional consumer tasks.
    ///
    /// All consumers share the queue's current cancellation token; a new token
    /// is created if none is active (first call, or after an abort). Returns
    /// the number of active consumers afterwards.
    ///
    /// Calling this on a released queue logs a warning and starts nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn consume(&self, count: usize) -> usize {
        let mut consumers = self.consumers.lock();

        if self.is_released() {
            tracing::warn!(queue = %self.name, "Consume on released queue ignored");
            return 0;
        }
        if count == 0 {
            return consumers.count;
        }

        let token = consumers
            .token
            .get_or_insert_with(CancellationToken::new)
            .clone();

        for _ in 0..count {
            let consumer_id = consumers.next_id;
            consumers.next_id += 1;
            self.tracker.spawn(consumer_loop(Consumer {
                queue: Arc::clone(&self.name),
                consumer_id,
                receiver: Arc::clone(&self.receiver),
                token: token.clone(),
                stats: Arc::clone(&self.stats),
            }));
        }
        consumers.count += count;
        consumers.aborted = false;

        tracing::debug!(
            queue = %self.name,
            added = count,
            consumers = consumers.count,
            "Consumers started"
        );
        consumers.count
    }

    /// Signals every consumer to stop after its current message and resets the
    /// consumer count to zero. Idempotent.
    pub fn abort_consume(&self) {
        let mut consumers = self.consumers.lock();
        Self::abort_locked(&self.name, &mut consumers);
    }

    fn abort_locked(name: &str, consumers: &mut Consumers) {
        if let Some(token) = consumers.token.take() {
            token.cancel();
            tracing::debug!(
                queue = name,
                consumers = consumers.count,
                "Consumers cancelled"
            );
            consumers.aborted = true;
        }
        consumers.count = 0;
    }

    /// Aborts all consumers and completes the writer. Later enqueues are
    /// dropped with a warning. Idempotent.
    pub fn release(&self) {
        let mut consumers = self.consumers.lock();
        Self::abort_locked(&self.name, &mut consumers);

        if self.sender.write().take().is_some() {
            self.tracker.close();
            tracing::info!(queue = %self.name, "Queue released");
        }
    }

    /// Waits until every consumer task of a released queue has exited.
    ///
    /// Does not complete before [`Self::release`] has been called.
    pub async fn closed(&self) {
        self.tracker.wait().await;
    }

    pub fn is_released(&self) -> bool {
        self.sender.read().is_none()
    }

    /// Number of consumers started since the last abort.
    pub fn consumer_count(&self) -> usize {
        self.consumers.lock().count
    }

    pub fn state(&self) -> QueueState {
        if self.is_released() {
            return QueueState::Released;
        }
        let consumers = self.consumers.lock();
        if consumers.count > 0 {
            QueueState::Consuming
        } else if consumers.aborted {
            QueueState::Cancelled
        } else {
            QueueState::Created
        }
    }

    pub fn stats(&self) -> QueueStatsSnapshot {
        self.stats.snapshot()
    }
}

impl core::fmt::Debug for InternalQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InternalQueue")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("consumers", &self.consumer_count())
            .finish_non_exhaustive()
    }
}

impl Drop for InternalQueue {
    fn drop(&mut self) {
        // Consumers only hold the receiver, so stop them explicitly.
        if let Some(token) = self.consumers.get_mut().token.take() {
            token.cancel();
        }
    }
}
