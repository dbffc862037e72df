mod consumer;
mod internal;
mod stats;

pub use internal::*;
pub use stats::QueueStatsSnapshot;
