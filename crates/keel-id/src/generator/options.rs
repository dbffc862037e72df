use crate::{Error, Result, SnowflakeId, TWITTER_EPOCH};
use core::time::Duration;

/// What a generator does while waiting for the next millisecond after its
/// sequence is exhausted.
///
/// The wait is bounded by one millisecond under a well-behaved clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WaitStrategy {
    /// Busy-spin with [`core::hint::spin_loop`]. Lowest latency.
    #[default]
    Spin,
    /// Yield the thread back to the OS scheduler between clock reads.
    Yield,
}

impl WaitStrategy {
    #[inline]
    pub(crate) fn wait(self) {
        match self {
            Self::Spin => core::hint::spin_loop(),
            Self::Yield => std::thread::yield_now(),
        }
    }
}

/// Construction parameters for a [`SnowflakeGenerator`].
///
/// # Example
///
/// ```
/// use keel_id::{GeneratorOptions, WaitStrategy, DISCORD_EPOCH};
///
/// let options = GeneratorOptions::new(1, 2)
///     .with_sequence(0)
///     .with_epoch(DISCORD_EPOCH)
///     .with_wait_strategy(WaitStrategy::Yield);
/// assert_eq!(options.worker_id, 2);
/// ```
///
/// [`SnowflakeGenerator`]: crate::SnowflakeGenerator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Data center ID, `0..=31`.
    pub data_center_id: u64,
    /// Worker ID, `0..=31`.
    pub worker_id: u64,
    /// Initial sequence value, `0..=4095`.
    pub sequence: u64,
    /// Zero point of the timestamp field as a duration since the UNIX epoch.
    /// Defaults to [`TWITTER_EPOCH`] when unset.
    pub epoch: Option<Duration>,
    pub wait_strategy: WaitStrategy,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl GeneratorOptions {
    pub const fn new(data_center_id: u64, worker_id: u64) -> Self {
        Self {
            data_center_id,
            worker_id,
            sequence: 0,
            epoch: None,
            wait_strategy: WaitStrategy::Spin,
        }
    }

    #[must_use]
    pub const fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    #[must_use]
    pub const fn with_epoch(mut self, epoch: Duration) -> Self {
        self.epoch = Some(epoch);
        self
    }

    #[must_use]
    pub const fn with_wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// The configured epoch in milliseconds since the UNIX epoch.
    pub fn epoch_millis(&self) -> u64 {
        self.epoch.unwrap_or(TWITTER_EPOCH).as_millis() as u64
    }

    /// Checks every field against its bit width and the epoch against `now_ms`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDataCenterId`], [`Error::InvalidWorkerId`] or
    ///   [`Error::InvalidSequence`] if a field does not fit its range.
    /// - [`Error::InvalidEpoch`] if the epoch is not strictly before `now_ms`.
    pub fn validate(&self, now_ms: u64) -> Result<()> {
        if self.data_center_id > SnowflakeId::MAX_DATA_CENTER_ID {
            return Err(Error::InvalidDataCenterId {
                value: self.data_center_id,
                max: SnowflakeId::MAX_DATA_CENTER_ID,
            });
        }
        if self.worker_id > SnowflakeId::MAX_WORKER_ID {
            return Err(Error::InvalidWorkerId {
                value: self.worker_id,
                max: SnowflakeId::MAX_WORKER_ID,
            });
        }
        if self.sequence > SnowflakeId::MAX_SEQUENCE {
            return Err(Error::InvalidSequence {
                value: self.sequence,
                max: SnowflakeId::MAX_SEQUENCE,
            });
        }
        let epoch_ms = self.epoch_millis();
        if epoch_ms >= now_ms {
            return Err(Error::InvalidEpoch { epoch_ms, now_ms });
        }
        Ok(())
    }
}
