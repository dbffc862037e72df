//! The job pipeline driven by the binary.

use crate::config::RunnerConfig;
use keel_id::{GeneratorOptions, SerialNumberRegistry};
use keel_queue::{
    AddQueueOptions, ConsumeOptions, EnqueueOptions, InternalQueueManager, InternalQueueProvider,
    MessageQueueProvider, QueueConfig, message,
};
use portable_atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Serial number group used to tag jobs.
pub const JOB_GROUP: &str = "runner-jobs";

/// Counts executions and wakes the waiter once `expected` is reached.
#[derive(Debug)]
pub struct Completion {
    done: AtomicUsize,
    expected: usize,
    notify: Notify,
}

impl Completion {
    pub fn new(expected: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            expected,
            notify: Notify::new(),
        }
    }

    pub fn record(&self) {
        if self.done.fetch_add(1, Ordering::AcqRel) + 1 == self.expected {
            self.notify.notify_one();
        }
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Acquire)
    }

    /// Resolves once every expected execution was recorded.
    pub async fn wait(&self) {
        if self.done() >= self.expected {
            return;
        }
        self.notify.notified().await;
    }
}

/// Everything the binary needs after the jobs were submitted.
pub struct Workload {
    pub manager: Arc<InternalQueueManager>,
    pub completion: Arc<Completion>,
    pub accepted: usize,
}

/// Sets up the queues, starts consumers and enqueues every job.
pub async fn start(config: &RunnerConfig) -> anyhow::Result<Workload> {
    let registry = SerialNumberRegistry::new()?;
    registry.register_generator(
        [JOB_GROUP],
        GeneratorOptions::new(config.data_center_id, config.worker_id),
    )?;

    let manager = Arc::new(InternalQueueManager::new(
        QueueConfig::default()
            .with_auto_consume(false)
            .with_shutdown_timeout(config.shutdown_timeout),
    ));
    let provider = InternalQueueProvider::new(Arc::clone(&manager));

    provider
        .add_queue(AddQueueOptions::new(&config.queues))
        .await?;
    for queue in &config.queues {
        provider
            .consume(ConsumeOptions::new(queue, config.consumers))
            .await?;
    }

    let completion = Arc::new(Completion::new(config.messages * config.queues.len()));
    let mut accepted = 0;
    for _ in 0..config.messages {
        let serial = registry.generate_serial_number(Some(JOB_GROUP))?;
        let completion = Arc::clone(&completion);
        let job = message("runner-job", move || {
            let completion = Arc::clone(&completion);
            async move {
                tracing::trace!(serial, "Job executed");
                completion.record();
                Ok(true)
            }
        });
        accepted += provider
            .enqueue(EnqueueOptions::new(&config.queues, job))
            .await?;
    }

    tracing::info!(
        accepted,
        queues = config.queues.len(),
        consumers = config.consumers,
        "Jobs submitted"
    );

    Ok(Workload {
        manager,
        completion,
        accepted,
    })
}
