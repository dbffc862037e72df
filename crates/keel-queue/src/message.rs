//! The unit of work carried by internal queues.
//!
//! A queue never looks inside a message; it only calls
//! [`QueueMessage::execute`]. Messages are shared as [`SharedMessage`] so the
//! same message can be fanned out to several queues without cloning its
//! payload.

use async_trait::async_trait;
use core::future::Future;
use std::sync::Arc;

/// Anything a consumer can execute.
///
/// `Ok(true)` means the work succeeded. `Ok(false)` and `Err(_)` are both
/// failures; they are logged by the consumer and the message is dropped (no
/// retry, no dead-letter queue). Panics are caught and treated the same way.
///
/// When a message is enqueued into several queues, `execute` runs once per
/// queue, possibly concurrently.
///
/// # Example
///
/// ```
/// use keel_queue::{QueueMessage, async_trait};
///
/// struct Audit {
///     line: String,
/// }
///
/// #[async_trait]
/// impl QueueMessage for Audit {
///     async fn execute(&self) -> anyhow::Result<bool> {
///         println!("audit: {}", self.line);
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait QueueMessage: Send + Sync + 'static {
    /// Performs the work.
    async fn execute(&self) -> anyhow::Result<bool>;

    /// Label used in logs.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// A reference-counted message as stored in queues.
pub type SharedMessage = Arc<dyn QueueMessage>;

/// A message backed by an async closure.
///
/// The closure is called once per execution.
pub struct FnMessage<F> {
    name: &'static str,
    f: F,
}

impl<F> FnMessage<F> {
    pub const fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

#[async_trait]
impl<F, Fut> QueueMessage for FnMessage<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn execute(&self) -> anyhow::Result<bool> {
        (self.f)().await
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Wraps an async closure into a [`SharedMessage`].
///
/// ```
/// use keel_queue::QueueMessage;
///
/// let message = keel_queue::message("ping", || async { Ok(true) });
/// assert_eq!(message.name(), "ping");
/// ```
pub fn message<F, Fut>(name: &'static str, f: F) -> SharedMessage
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(FnMessage::new(name, f))
}
