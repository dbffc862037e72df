//! Directory of named internal queues.
//!
//! [`InternalQueueManager`] owns every [`InternalQueue`] of an application,
//! creates them lazily under a per-name creation lock, and forwards bulk
//! consume/abort/delete operations. It is an ordinary value: construct one per
//! application (or per test) and share it through an `Arc`.

use crate::{Error, InternalQueue, QueueConfig, Result};
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, sync::Arc};
use tokio::time::timeout;

/// Registry of [`InternalQueue`]s keyed by name.
///
/// At most one live queue exists per name: creation takes a lock dedicated to
/// that name and re-checks the registry before constructing anything.
pub struct InternalQueueManager {
    config: QueueConfig,
    queues: RwLock<HashMap<String, Arc<InternalQueue>>>,
    creation_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Default for InternalQueueManager {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

impl InternalQueueManager {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            queues: RwLock::new(HashMap::new()),
            creation_locks: Mutex::new(HashMap::new()),
        }
    }

    pub const fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Returns the queue named `name`, creating it if needed.
    ///
    /// A newly created queue immediately gets
    /// [`QueueConfig::auto_consume_count`] consumers when auto-consume is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `name` is empty.
    ///
    /// # Panics
    ///
    /// With auto-consume enabled, panics if called outside of a Tokio runtime.
    pub fn add_queue(&self, name: &str) -> Result<Arc<InternalQueue>> {
        if name.is_empty() {
            return Err(Error::invalid("queue name must not be empty"));
        }
        if let Some(queue) = self.get_queue(name) {
            return Ok(queue);
        }

        loop {
            let creation_lock = Arc::clone(
                self.creation_locks
                    .lock()
                    .entry(name.to_owned())
                    .or_default(),
            );
            let _guard = creation_lock.lock();

            // A delete may have retired this lock while we waited for it.
            if !self.is_current_lock(name, &creation_lock) {
                continue;
            }

            // Another caller may have created it while we waited for the lock.
            if let Some(queue) = self.get_queue(name) {
                return Ok(queue);
            }

            let queue = Arc::new(InternalQueue::new(name));
            self.queues
                .write()
                .insert(name.to_owned(), Arc::clone(&queue));
            tracing::info!(queue = name, "Internal queue created");

            if self.config.auto_consume_internal_queue {
                queue.consume(self.config.auto_consume_count);
            }
            return Ok(queue);
        }
    }

    /// Applies [`Self::add_queue`] to every name.
    ///
    /// # Errors
    ///
    /// Stops at the first empty name; queues created before it are kept.
    pub fn add_queues<I, S>(&self, names: I) -> Result<Vec<Arc<InternalQueue>>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| self.add_queue(name.as_ref()))
            .collect()
    }

    pub fn get_queue(&self, name: &str) -> Option<Arc<InternalQueue>> {
        self.queues.read().get(name).cloned()
    }

    /// Releases and removes the named queues. Unknown names are ignored.
    ///
    /// Returns the number of queues removed.
    pub fn delete_queue<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removed: Vec<_> = names
            .into_iter()
            .filter_map(|name| self.remove_queue(name.as_ref()))
            .collect();
        for queue in &removed {
            queue.release();
        }
        removed.len()
    }

    /// Releases and removes every queue. Returns the number removed.
    pub fn delete_all_queues(&self) -> usize {
        let removed = self.remove_all();
        for queue in &removed {
            queue.release();
        }
        removed.len()
    }

    /// Starts `count` consumers on each named queue. Unknown names are skipped.
    ///
    /// Returns the number of queues affected.
    pub fn consume<I, S>(&self, names: I, count: usize) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.for_each_named(names, |queue| {
            queue.consume(count);
        })
    }

    /// Starts `count` consumers on every queue.
    pub fn consume_all(&self, count: usize) -> usize {
        self.for_each(|queue| {
            queue.consume(count);
        })
    }

    /// Aborts consumers of each named queue. Unknown names are skipped.
    pub fn abort_consume<I, S>(&self, names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.for_each_named(names, InternalQueue::abort_consume)
    }

    /// Aborts consumers of every queue.
    pub fn abort_all_consume(&self) -> usize {
        self.for_each(InternalQueue::abort_consume)
    }

    /// Names of all registered queues, in no particular order.
    pub fn queue_names(&self) -> Vec<String> {
        self.queues.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.read().is_empty()
    }

    /// Releases every queue and waits for their consumers to exit.
    ///
    /// Consumers finish the message they are executing; the wait is bounded by
    /// [`QueueConfig::shutdown_timeout`]. Messages still queued are dropped.
    pub async fn shutdown(&self) {
        let queues = self.remove_all();
        tracing::info!(queues = queues.len(), "Shutting down internal queues");

        for queue in &queues {
            queue.release();
        }

        let wait_all = futures::future::join_all(queues.iter().map(|queue| queue.closed()));
        match timeout(self.config.shutdown_timeout, wait_all).await {
            Ok(_) => tracing::debug!("All consumers stopped"),
            Err(_) => tracing::warn!(
                timeout = ?self.config.shutdown_timeout,
                "Timed out waiting for consumers to stop"
            ),
        }

        tracing::info!("Internal queue shutdown complete");
    }

    fn is_current_lock(&self, name: &str, creation_lock: &Arc<Mutex<()>>) -> bool {
        self.creation_locks
            .lock()
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, creation_lock))
    }

    /// Unregisters `name` and retires its creation lock, both under that lock
    /// so a concurrent `add_queue` either sees the queue or starts over.
    fn remove_queue(&self, name: &str) -> Option<Arc<InternalQueue>> {
        let Some(creation_lock) = self.creation_locks.lock().get(name).cloned() else {
            return self.queues.write().remove(name);
        };
        let _guard = creation_lock.lock();

        let queue = self.queues.write().remove(name);
        let mut locks = self.creation_locks.lock();
        if locks
            .get(name)
            .is_some_and(|current| Arc::ptr_eq(current, &creation_lock))
        {
            locks.remove(name);
        }
        queue
    }

    fn remove_all(&self) -> Vec<Arc<InternalQueue>> {
        self.queue_names()
            .iter()
            .filter_map(|name| self.remove_queue(name))
            .collect()
    }

    fn for_each(&self, f: impl Fn(&InternalQueue)) -> usize {
        let queues: Vec<_> = self.queues.read().values().cloned().collect();
        for queue in &queues {
            f(queue);
        }
        queues.len()
    }

    fn for_each_named<I, S>(&self, names: I, f: impl Fn(&InternalQueue)) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut affected = 0;
        for name in names {
            match self.get_queue(name.as_ref()) {
                Some(queue) => {
                    f(&queue);
                    affected += 1;
                }
                None => tracing::debug!(queue = name.as_ref(), "Queue not found, skipped"),
            }
        }
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueueState, message};
    use core::time::Duration;
    use std::sync::Barrier;
    use tokio::{sync::Notify, time::Instant};

    fn manual() -> QueueConfig {
        QueueConfig::default().with_auto_consume(false)
    }

    #[tokio::test]
    async fn add_queue_returns_existing_instance() {
        let manager = InternalQueueManager::new(manual());
        let a = manager.add_queue("x").unwrap();
        let b = manager.add_queue("x").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.len(), 1);
        assert_eq!(a.state(), QueueState::Created);
    }

    #[test]
    fn concurrent_add_queue_creates_one_instance() {
        const CALLERS: usize = 16;

        let manager = InternalQueueManager::new(manual());
        let barrier = Barrier::new(CALLERS);

        let queues: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..CALLERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        manager.add_queue("x").unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(manager.len(), 1);
        let first = &queues[0];
        assert!(queues.iter().all(|queue| Arc::ptr_eq(first, queue)));
    }

    #[test]
    fn empty_name_is_rejected() {
        let manager = InternalQueueManager::new(manual());
        assert!(matches!(
            manager.add_queue(""),
            Err(Error::InvalidRequest { .. })
        ));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn auto_consume_starts_consumers() {
        let manager =
            InternalQueueManager::new(QueueConfig::default().with_auto_consume_count(2));
        let queue = manager.add_queue("auto").unwrap();
        assert_eq!(queue.consumer_count(), 2);
        assert_eq!(queue.state(), QueueState::Consuming);
    }

    #[tokio::test]
    async fn bulk_operations_skip_unknown_queues() {
        let manager = InternalQueueManager::new(manual());
        manager.add_queues(["a", "b", "c"]).unwrap();

        assert_eq!(manager.consume(["a", "missing"], 2), 1);
        assert_eq!(manager.get_queue("a").unwrap().consumer_count(), 2);
        assert_eq!(manager.get_queue("b").unwrap().consumer_count(), 0);

        assert_eq!(manager.consume_all(1), 3);
        assert_eq!(manager.get_queue("a").unwrap().consumer_count(), 3);

        assert_eq!(manager.abort_consume(["b"]), 1);
        assert_eq!(manager.get_queue("b").unwrap().state(), QueueState::Cancelled);

        assert_eq!(manager.abort_all_consume(), 3);
        assert!(
            manager
                .queue_names()
                .iter()
                .all(|name| manager.get_queue(name).unwrap().consumer_count() == 0)
        );
    }

    #[tokio::test]
    async fn delete_releases_and_removes() {
        let manager = InternalQueueManager::new(manual());
        let queues = manager.add_queues(["a", "b", "c"]).unwrap();

        assert_eq!(manager.delete_queue(["a", "missing"]), 1);
        assert!(manager.get_queue("a").is_none());
        assert_eq!(queues[0].state(), QueueState::Released);

        // a fresh queue replaces the deleted one
        let again = manager.add_queue("a").unwrap();
        assert!(!Arc::ptr_eq(&again, &queues[0]));
        assert_eq!(again.state(), QueueState::Created);

        assert_eq!(manager.delete_all_queues(), 3);
        assert!(manager.is_empty());
        assert!(queues.iter().all(|queue| queue.is_released()));
    }

    #[tokio::test]
    async fn shutdown_waits_for_consumers() {
        let manager = InternalQueueManager::new(
            QueueConfig::default().with_shutdown_timeout(Duration::from_secs(5)),
        );
        let queue = manager.add_queue("work").unwrap();
        queue.enqueue([message("noop", || async { Ok(true) })]);

        tokio::time::timeout(Duration::from_secs(10), manager.shutdown())
            .await
            .expect("shutdown hung");

        assert!(manager.is_empty());
        assert!(queue.is_released());
        assert_eq!(queue.enqueue([message("late", || async { Ok(true) })]), 0);
    }

    #[tokio::test]
    async fn shutdown_gives_up_on_stuck_consumers() {
        const TIMEOUT: Duration = Duration::from_millis(100);

        let manager =
            InternalQueueManager::new(QueueConfig::default().with_shutdown_timeout(TIMEOUT));
        let queue = manager.add_queue("stuck").unwrap();

        let started = Arc::new(Notify::new());
        let signal = Arc::clone(&started);
        queue.enqueue([message("never-finishes", move || {
            let signal = Arc::clone(&signal);
            async move {
                signal.notify_one();
                std::future::pending::<anyhow::Result<bool>>().await
            }
        })]);
        tokio::time::timeout(Duration::from_secs(5), started.notified())
            .await
            .expect("message never started");

        let begin = Instant::now();
        tokio::time::timeout(Duration::from_secs(5), manager.shutdown())
            .await
            .expect("shutdown ignored its timeout");

        assert!(begin.elapsed() >= TIMEOUT);
        assert!(manager.is_empty());
        assert!(queue.is_released());
    }

    #[test]
    fn deleted_queues_leave_no_creation_locks() {
        let manager = InternalQueueManager::new(manual());

        for i in 0..1000 {
            let name = format!("q{i}");
            manager.add_queue(&name).unwrap();
            assert_eq!(manager.delete_queue([&name]), 1);
        }
        assert!(manager.is_empty());
        assert!(manager.creation_locks.lock().is_empty());

        manager.add_queues(["a", "b", "c"]).unwrap();
        assert_eq!(manager.creation_locks.lock().len(), 3);
        assert_eq!(manager.delete_all_queues(), 3);
        assert!(manager.creation_locks.lock().is_empty());
    }

    #[tokio::test]
    async fn shutdown_leaves_no_creation_locks() {
        let manager = InternalQueueManager::new(manual());
        manager.add_queues(["a", "b"]).unwrap();

        manager.shutdown().await;
        assert!(manager.creation_locks.lock().is_empty());
    }

    #[test]
    fn add_racing_delete_never_duplicates_a_queue() {
        const ADDERS: usize = 4;
        const DELETERS: usize = 2;
        const ROUNDS: usize = 500;

        let manager = InternalQueueManager::new(manual());
        let barrier = Barrier::new(ADDERS + DELETERS);

        let added: Vec<Arc<InternalQueue>> = std::thread::scope(|s| {
            let adders: Vec<_> = (0..ADDERS)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        (0..ROUNDS)
                            .map(|_| manager.add_queue("x").unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for _ in 0..DELETERS {
                s.spawn(|| {
                    barrier.wait();
                    for _ in 0..ROUNDS {
                        manager.delete_queue(["x"]);
                    }
                });
            }
            adders
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });

        // Every queue handed out was either deleted (and so released) or is
        // the one still registered.
        let current = manager.get_queue("x");
        for queue in &added {
            let registered = current
                .as_ref()
                .is_some_and(|current| Arc::ptr_eq(current, queue));
            assert!(registered || queue.is_released());
        }
        assert_eq!(manager.creation_locks.lock().len(), manager.len());
    }
}
