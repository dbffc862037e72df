use core::cmp::Ordering;
use parking_lot::Mutex;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, GeneratorOptions, Result, SnowflakeId, SystemClock, TimeSource, WaitStrategy,
};

/// A lock-based Snowflake ID generator safe to share across threads.
///
/// The last issued ID (and with it the last timestamp and sequence) lives
/// behind a single [`Mutex`]. The clock is read while the lock is held, so
/// concurrent callers always observe a consistent `(timestamp, sequence)` pair
/// and IDs from one generator are strictly increasing.
///
/// ## Behavior
/// - Up to 4096 IDs per millisecond. Once exhausted, the call waits (per the
///   configured [`WaitStrategy`]) until the clock reaches the next millisecond.
/// - If the clock reports a time earlier than the last issued ID, the call
///   fails with [`Error::ClockMovedBackwards`] and issues nothing.
///
/// # Example
///
/// ```
/// use keel_id::{GeneratorOptions, SnowflakeGenerator, SystemClock};
///
/// let generator = SnowflakeGenerator::new(GeneratorOptions::new(1, 1), SystemClock).unwrap();
/// let a = generator.generate_id().unwrap();
/// let b = generator.generate_id().unwrap();
/// assert!(b > a);
/// ```
#[derive(Debug)]
pub struct SnowflakeGenerator<T = SystemClock>
where
    T: TimeSource,
{
    state: Mutex<SnowflakeId>,
    epoch_ms: u64,
    wait_strategy: WaitStrategy,
    time: T,
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator from validated options.
    ///
    /// The initial state carries a zero timestamp and the configured sequence,
    /// so the first ID is stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns the range or epoch error reported by
    /// [`GeneratorOptions::validate`].
    pub fn new(options: GeneratorOptions, time: T) -> Result<Self> {
        options.validate(time.current_millis())?;
        let id = SnowflakeId::from_components(
            0,
            options.data_center_id,
            options.worker_id,
            options.sequence,
        );
        Ok(Self {
            state: Mutex::new(id),
            epoch_ms: options.epoch_millis(),
            wait_strategy: options.wait_strategy,
            time,
        })
    }

    /// The data center ID stamped into every ID.
    pub fn data_center_id(&self) -> u64 {
        self.state.lock().data_center_id()
    }

    /// The worker ID stamped into every ID.
    pub fn worker_id(&self) -> u64 {
        self.state.lock().worker_id()
    }

    /// The epoch in milliseconds since the UNIX epoch.
    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_ms
    }

    /// The last ID handed out (or the initial state if none was).
    pub fn last_id(&self) -> SnowflakeId {
        *self.state.lock()
    }

    /// Generates the next ID from the generator's clock.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if the clock is behind the last issued
    ///   ID, including while waiting for the next millisecond.
    /// - [`Error::TimestampOutOfRange`] if the clock is before the epoch or
    ///   past the 41-bit range.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate_id(&self) -> Result<SnowflakeId> {
        let mut id = self.state.lock();
        let now = self.offset(self.time.current_millis())?;
        let last = id.timestamp();

        match now.cmp(&last) {
            Ordering::Equal => {
                if id.has_sequence_room() {
                    *id = id.increment_sequence();
                } else {
                    let next = self.wait_next_millis(last)?;
                    *id = id.rollover_to_timestamp(next);
                }
            }
            Ordering::Greater => *id = id.rollover_to_timestamp(now),
            Ordering::Less => return Err(self.cold_clock_behind(last, now)),
        }

        Ok(*id)
    }

    /// Generates the next ID for a caller-supplied time (milliseconds since the
    /// UNIX epoch) instead of the clock.
    ///
    /// Rollback and sequence handling are the same as
    /// [`Self::generate_id`], except that an exhausted sequence moves on to
    /// `timestamp_ms + 1` directly since the supplied timeline cannot be waited
    /// on.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockMovedBackwards`] if `timestamp_ms` is earlier than the
    ///   last issued ID.
    /// - [`Error::TimestampOutOfRange`] if `timestamp_ms` (or its successor on
    ///   sequence exhaustion) cannot be encoded.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn generate_id_by_time(&self, timestamp_ms: u64) -> Result<SnowflakeId> {
        let mut id = self.state.lock();
        let now = self.offset(timestamp_ms)?;
        let last = id.timestamp();

        match now.cmp(&last) {
            Ordering::Equal => {
                if id.has_sequence_room() {
                    *id = id.increment_sequence();
                } else {
                    let next = self.offset(timestamp_ms + 1)?;
                    *id = id.rollover_to_timestamp(next);
                }
            }
            Ordering::Greater => *id = id.rollover_to_timestamp(now),
            Ordering::Less => return Err(self.cold_clock_behind(last, now)),
        }

        Ok(*id)
    }

    /// Converts a UNIX timestamp to an offset that fits the 41-bit field.
    fn offset(&self, timestamp_ms: u64) -> Result<u64> {
        timestamp_ms
            .checked_sub(self.epoch_ms)
            .filter(|offset| *offset <= SnowflakeId::MAX_TIMESTAMP)
            .ok_or(Error::TimestampOutOfRange {
                timestamp_ms,
                epoch_ms: self.epoch_ms,
            })
    }

    /// Re-reads the clock until it moves past `last`. Called with the state
    /// lock held.
    fn wait_next_millis(&self, last: u64) -> Result<u64> {
        loop {
            let now = self.offset(self.time.current_millis())?;
            match now.cmp(&last) {
                Ordering::Greater => return Ok(now),
                Ordering::Equal => self.wait_strategy.wait(),
                Ordering::Less => return Err(self.cold_clock_behind(last, now)),
            }
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, last: u64, now: u64) -> Error {
        let last = last + self.epoch_ms;
        let now = now + self.epoch_ms;
        #[cfg(feature = "tracing")]
        tracing::warn!(last, now, "clock moved backwards, refusing to generate id");
        Error::ClockMovedBackwards { last, now }
    }
}
