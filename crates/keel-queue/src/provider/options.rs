use crate::SharedMessage;

/// Which queues an operation applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueScope {
    /// Every registered queue.
    All,
    /// Only the named queues.
    Named(Vec<String>),
}

impl QueueScope {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Named(names.into_iter().map(Into::into).collect())
    }
}

/// Parameters for [`MessageQueueProvider::add_queue`].
///
/// [`MessageQueueProvider::add_queue`]: crate::MessageQueueProvider::add_queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddQueueOptions {
    pub names: Vec<String>,
}

impl AddQueueOptions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parameters for [`MessageQueueProvider::delete_queue`].
///
/// [`MessageQueueProvider::delete_queue`]: crate::MessageQueueProvider::delete_queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteQueueOptions {
    pub scope: QueueScope,
}

impl DeleteQueueOptions {
    pub const fn all() -> Self {
        Self {
            scope: QueueScope::All,
        }
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope: QueueScope::named(names),
        }
    }
}

/// Parameters for [`MessageQueueProvider::enqueue`]: every message is written
/// to every target queue.
///
/// [`MessageQueueProvider::enqueue`]: crate::MessageQueueProvider::enqueue
#[derive(Clone, Default)]
pub struct EnqueueOptions {
    pub queues: Vec<String>,
    pub messages: Vec<SharedMessage>,
}

impl EnqueueOptions {
    pub fn new<I, S>(queues: I, message: SharedMessage) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queues: queues.into_iter().map(Into::into).collect(),
            messages: vec![message],
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: SharedMessage) -> Self {
        self.messages.push(message);
        self
    }
}

impl core::fmt::Debug for EnqueueOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EnqueueOptions")
            .field("queues", &self.queues)
            .field(
                "messages",
                &self.messages.iter().map(|m| m.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Parameters for [`MessageQueueProvider::consume`].
///
/// [`MessageQueueProvider::consume`]: crate::MessageQueueProvider::consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOptions {
    pub queue: String,
    pub consumers: usize,
}

impl ConsumeOptions {
    pub fn new(queue: impl Into<String>, consumers: usize) -> Self {
        Self {
            queue: queue.into(),
            consumers,
        }
    }
}

/// Parameters for [`MessageQueueProvider::abort_consume`].
///
/// [`MessageQueueProvider::abort_consume`]: crate::MessageQueueProvider::abort_consume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortConsumeOptions {
    pub scope: QueueScope,
}

impl AbortConsumeOptions {
    pub const fn all() -> Self {
        Self {
            scope: QueueScope::All,
        }
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope: QueueScope::named(names),
        }
    }
}
