use crate::{SharedMessage, queue::stats::QueueStats};
use core::panic::AssertUnwindSafe;
use futures::FutureExt;
use std::{any::Any, sync::Arc};
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

pub(crate) type SharedReceiver = Arc<Mutex<mpsc::UnboundedReceiver<SharedMessage>>>;

/// Everything a consumer task needs, detached from the owning queue so the
/// task does not keep the queue alive.
pub(crate) struct Consumer {
    pub(crate) queue: Arc<str>,
    pub(crate) consumer_id: usize,
    pub(crate) receiver: SharedReceiver,
    pub(crate) token: CancellationToken,
    pub(crate) stats: Arc<QueueStats>,
}

/// Consumer task for one internal queue.
///
/// Waits for either the next message or cancellation; that wait is the only
/// suspension point besides the message execution itself. A received message
/// is always executed to completion, since cancellation is only observed
/// between messages.
///
/// Consumers of the same queue share one receiver: whichever consumer holds
/// the receiver lock takes the next message, so each message is executed by
/// exactly one consumer.
///
/// The loop ends when:
/// - the queue's cancellation token fires (abort or release), or
/// - the channel is closed and drained.
pub(crate) async fn consumer_loop(consumer: Consumer) {
    let Consumer {
        queue,
        consumer_id,
        receiver,
        token,
        stats,
    } = consumer;

    tracing::trace!(queue = %queue, consumer_id, "Consumer started");

    loop {
        let next = tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::debug!(queue = %queue, consumer_id, "Consumer cancelled");
                break;
            }
            message = next_message(&receiver) => message,
        };

        let Some(message) = next else {
            tracing::debug!(queue = %queue, consumer_id, "Channel closed, consumer exiting");
            break;
        };

        execute(&queue, consumer_id, &stats, message).await;
    }

    tracing::trace!(queue = %queue, consumer_id, "Consumer stopped");
}

async fn next_message(receiver: &SharedReceiver) -> Option<SharedMessage> {
    receiver.lock().await.recv().await
}

/// Runs one message, containing every kind of failure.
async fn execute(queue: &str, consumer_id: usize, stats: &QueueStats, message: SharedMessage) {
    let name = message.name();
    match AssertUnwindSafe(message.execute()).catch_unwind().await {
        Ok(Ok(true)) => {
            stats.record_succeeded();
            tracing::trace!(queue, consumer_id, message = name, "Message executed");
        }
        Ok(Ok(false)) => {
            stats.record_failed();
            tracing::warn!(queue, consumer_id, message = name, "Message reported failure");
        }
        Ok(Err(e)) => {
            stats.record_failed();
            tracing::error!(
                queue,
                consumer_id,
                message = name,
                error = ?e,
                "Message execution failed"
            );
        }
        Err(panic) => {
            stats.record_failed();
            tracing::error!(
                queue,
                consumer_id,
                message = name,
                panic = panic_message(panic.as_ref()),
                "Message execution panicked"
            );
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
