//! Error types for the queue subsystem.
//!
//! Only configuration and lookup problems surface as [`Error`]. Failures while
//! a consumer executes a message, and writes to a released queue, are logged
//! and never reach the producer.
//!
//! ## Error Cases
//! - `QueueNotFound`: an operation targeted a queue that does not exist and
//!   auto-create is disabled.
//! - `InvalidRequest`: the request was malformed (empty queue name, no target
//!   queues, zero consumers).

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for queue management and the provider facade.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The target queue is not registered and auto-create is disabled.
    #[error("Queue not found: {name}")]
    QueueNotFound { name: String },

    /// The request was malformed.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}
