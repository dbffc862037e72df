use crate::TimeSource;
use std::time::{SystemTime, UNIX_EPOCH};

/// The system wall clock.
///
/// Reads `SystemTime::now()` on every call. Wall-clock adjustments (NTP steps,
/// manual changes) are visible to generators using this clock, which is what
/// lets them detect and refuse a clock rollback.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A clock set before 1970 reads as zero, which every generator rejects
        // as out of range instead of wrapping.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}
