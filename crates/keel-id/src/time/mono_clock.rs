use crate::{SystemClock, TimeSource};
use core::{fmt, time::Duration};
use portable_atomic::{AtomicU64, Ordering};
use std::{
    sync::{Arc, Weak},
    thread,
    time::Instant,
};

/// Milliseconds elapsed since the clock was anchored.
#[derive(Default)]
struct Elapsed(AtomicU64);

/// A monotonic time source anchored to the wall clock at construction.
///
/// Returns the UNIX time observed at construction plus the monotonic time
/// elapsed since then. Wall-clock adjustments after construction are not
/// visible, so generators using this clock never observe a rollback.
///
/// A background thread publishes the elapsed milliseconds into a shared atomic
/// once per millisecond, so reads never hit a syscall. The thread exits once
/// every clone of the clock is dropped.
///
/// # Example
///
/// ```
/// use keel_id::{MonotonicClock, TimeSource};
///
/// let clock = MonotonicClock::new();
/// let a = clock.current_millis();
/// std::thread::sleep(std::time::Duration::from_millis(5));
/// assert!(clock.current_millis() >= a);
/// ```
#[derive(Clone)]
pub struct MonotonicClock {
    elapsed: Arc<Elapsed>,
    anchor_ms: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MonotonicClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonotonicClock")
            .field("anchor_ms", &self.anchor_ms)
            .field("now_ms", &self.current_millis())
            .finish()
    }
}

impl MonotonicClock {
    /// Starts a new ticker anchored to the current wall-clock time.
    pub fn new() -> Self {
        let anchor_ms = SystemClock.current_millis();
        let elapsed = Arc::new(Elapsed::default());
        let weak = Arc::downgrade(&elapsed);
        thread::spawn(move || tick(&weak));
        Self { elapsed, anchor_ms }
    }
}

/// Publishes elapsed milliseconds until the last clock handle is gone.
///
/// Sleeps toward absolute deadlines so oversleeping never accumulates drift.
fn tick(weak: &Weak<Elapsed>) {
    let start = Instant::now();
    let mut next_ms = 0;

    while let Some(elapsed) = weak.upgrade() {
        let deadline = start + Duration::from_millis(next_ms);
        if let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            thread::sleep(remaining);
        }

        let now_ms = start.elapsed().as_millis() as u64;
        elapsed.0.store(now_ms, Ordering::Release);
        next_ms = now_ms + 1;
    }
}

impl TimeSource for MonotonicClock {
    fn current_millis(&self) -> u64 {
        self.anchor_ms + self.elapsed.0.load(Ordering::Acquire)
    }
}
