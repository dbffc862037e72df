//! Error types for ID generation.
//!
//! Configuration errors (`InvalidDataCenterId`, `InvalidWorkerId`,
//! `InvalidSequence`, `InvalidEpoch`) are raised when a generator is built and
//! never leave a registry half-populated. `ClockMovedBackwards` and
//! `TimestampOutOfRange` are raised by a single generation call; the generator
//! state is untouched and the caller may retry once the clock recovers.

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `keel-id` can produce.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The data center ID does not fit in its 5-bit field.
    #[error("data center id {value} out of range (0..={max})")]
    InvalidDataCenterId { value: u64, max: u64 },

    /// The worker ID does not fit in its 5-bit field.
    #[error("worker id {value} out of range (0..={max})")]
    InvalidWorkerId { value: u64, max: u64 },

    /// The initial sequence does not fit in its 12-bit field.
    #[error("sequence {value} out of range (0..={max})")]
    InvalidSequence { value: u64, max: u64 },

    /// The configured epoch is not strictly in the past.
    #[error("epoch {epoch_ms}ms must be earlier than the current time {now_ms}ms")]
    InvalidEpoch { epoch_ms: u64, now_ms: u64 },

    /// The clock reported a time earlier than the last issued ID.
    #[error("clock moved backwards: refusing to generate id ({now} < {last})")]
    ClockMovedBackwards { last: u64, now: u64 },

    /// The timestamp is before the epoch or does not fit in 41 bits.
    #[error("timestamp {timestamp_ms}ms cannot be encoded relative to epoch {epoch_ms}ms")]
    TimestampOutOfRange { timestamp_ms: u64, epoch_ms: u64 },
}
