use core::time::Duration;

/// Queue subsystem configuration.
///
/// Read on every operation that depends on it; changing a value requires
/// building a new [`InternalQueueManager`].
///
/// [`InternalQueueManager`]: crate::InternalQueueManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Create unknown queues when an enqueue or consume targets them, instead
    /// of failing with [`Error::QueueNotFound`].
    ///
    /// [`Error::QueueNotFound`]: crate::Error::QueueNotFound
    pub auto_create_internal_queue: bool,

    /// Start consumers on every newly created queue.
    pub auto_consume_internal_queue: bool,

    /// Number of consumers started by auto-consume.
    pub auto_consume_count: usize,

    /// How long [`InternalQueueManager::shutdown`] waits for consumers to
    /// finish their in-flight message.
    ///
    /// [`InternalQueueManager::shutdown`]: crate::InternalQueueManager::shutdown
    pub shutdown_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            auto_create_internal_queue: true,
            auto_consume_internal_queue: true,
            auto_consume_count: 1,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl QueueConfig {
    #[must_use]
    pub const fn with_auto_create(mut self, enabled: bool) -> Self {
        self.auto_create_internal_queue = enabled;
        self
    }

    #[must_use]
    pub const fn with_auto_consume(mut self, enabled: bool) -> Self {
        self.auto_consume_internal_queue = enabled;
        self
    }

    #[must_use]
    pub const fn with_auto_consume_count(mut self, count: usize) -> Self {
        self.auto_consume_count = count;
        self
    }

    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}
