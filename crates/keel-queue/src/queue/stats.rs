use portable_atomic::{AtomicU64, Ordering};

/// Running counters for a single queue.
///
/// Updated with relaxed atomics from producers and consumers; a snapshot is
/// only approximately consistent while the queue is busy.
#[derive(Debug, Default)]
pub(crate) struct QueueStats {
    enqueued: AtomicU64,
    rejected: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
}

impl QueueStats {
    pub(crate) fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self, count: u64) {
        self.rejected.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a queue's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsSnapshot {
    /// Messages accepted by the channel.
    pub enqueued: u64,
    /// Messages refused because the queue was released.
    pub rejected: u64,
    /// Executions that returned `Ok(true)`.
    pub succeeded: u64,
    /// Executions that returned `Ok(false)`, an error, or panicked.
    pub failed: u64,
}

impl QueueStatsSnapshot {
    /// Messages that finished executing, successfully or not.
    pub const fn executed(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Accepted messages not yet executed (waiting or in flight).
    pub const fn pending(&self) -> u64 {
        self.enqueued.saturating_sub(self.executed())
    }
}
