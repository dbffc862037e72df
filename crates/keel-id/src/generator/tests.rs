use crate::{
    Error, GeneratorOptions, MonotonicClock, SnowflakeGenerator, SnowflakeId, SystemClock,
    TimeSource, UNIX_EPOCH_MS, WaitStrategy,
};
use portable_atomic::{AtomicU64, Ordering};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread::scope;

/// A clock the test can move freely, backwards included.
#[derive(Clone, Debug)]
struct MockTime {
    millis: Arc<AtomicU64>,
}

impl MockTime {
    fn at(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Reports `start` for a fixed number of reads, then `start + 1` forever.
#[derive(Debug)]
struct TickAfter {
    start: u64,
    reads_left: AtomicU64,
}

impl TimeSource for TickAfter {
    fn current_millis(&self) -> u64 {
        let left = self.reads_left.load(Ordering::SeqCst);
        if left == 0 {
            self.start + 1
        } else {
            self.reads_left.store(left - 1, Ordering::SeqCst);
            self.start
        }
    }
}

fn unix_options(data_center_id: u64, worker_id: u64) -> GeneratorOptions {
    GeneratorOptions::new(data_center_id, worker_id).with_epoch(UNIX_EPOCH_MS)
}

fn run_generator_monotonic<T: TimeSource>(generator: &SnowflakeGenerator<T>) {
    const TOTAL_IDS: usize = 4096 * 64;

    let mut last = generator.generate_id().unwrap();
    for _ in 0..TOTAL_IDS {
        let id = generator.generate_id().unwrap();
        assert!(id > last, "{id:?} is not greater than {last:?}");
        if id.timestamp() == last.timestamp() {
            assert_eq!(id.sequence(), last.sequence() + 1);
        } else {
            assert_eq!(id.sequence(), 0);
        }
        last = id;
    }
}

#[test]
fn sequence_increments_within_same_tick() {
    let generator = SnowflakeGenerator::new(unix_options(3, 4), MockTime::at(42)).unwrap();

    let id1 = generator.generate_id().unwrap();
    let id2 = generator.generate_id().unwrap();
    let id3 = generator.generate_id().unwrap();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert_eq!(id1.data_center_id(), 3);
    assert_eq!(id1.worker_id(), 4);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn exhausted_sequence_waits_for_next_millisecond() {
    let clock = TickAfter {
        start: 42,
        // construction, 4096 IDs, then the call that finds the sequence full
        reads_left: AtomicU64::new(1 + 4096 + 1),
    };
    let generator = SnowflakeGenerator::new(unix_options(1, 1), clock).unwrap();

    let mut seen = HashSet::new();
    for expected in 0..=SnowflakeId::MAX_SEQUENCE {
        let id = generator.generate_id().unwrap();
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.sequence(), expected);
        assert!(seen.insert(id));
    }
    assert_eq!(seen.len(), 4096);

    let id = generator.generate_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
    assert!(!seen.contains(&id));
}

#[test]
fn exhausted_sequence_with_yield_strategy() {
    let clock = TickAfter {
        start: 7,
        reads_left: AtomicU64::new(1 + 4096 + 10),
    };
    let options = unix_options(0, 0).with_wait_strategy(WaitStrategy::Yield);
    let generator = SnowflakeGenerator::new(options, clock).unwrap();

    for _ in 0..4096 {
        generator.generate_id().unwrap();
    }
    let id = generator.generate_id().unwrap();
    assert_eq!(id.timestamp(), 8);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn rollback_by_time_is_rejected() {
    let generator = SnowflakeGenerator::new(unix_options(1, 1), MockTime::at(1_000)).unwrap();

    let first = generator.generate_id_by_time(500).unwrap();
    let err = generator.generate_id_by_time(499).unwrap_err();
    assert_eq!(err, Error::ClockMovedBackwards { last: 500, now: 499 });

    // the failed call leaves the state untouched
    assert_eq!(generator.last_id(), first);
    let next = generator.generate_id_by_time(500).unwrap();
    assert_eq!(next.sequence(), first.sequence() + 1);
}

#[test]
fn rollback_of_clock_is_rejected() {
    let clock = MockTime::at(100);
    let generator = SnowflakeGenerator::new(unix_options(1, 1), clock.clone()).unwrap();

    let before = generator.generate_id().unwrap();
    clock.set(90);
    assert!(matches!(
        generator.generate_id(),
        Err(Error::ClockMovedBackwards { last: 100, now: 90 })
    ));

    clock.set(101);
    let after = generator.generate_id().unwrap();
    assert!(after > before);
    assert_eq!(after.sequence(), 0);
}

#[test]
fn exhausted_sequence_by_time_moves_to_next_millisecond() {
    let generator = SnowflakeGenerator::new(unix_options(1, 1), MockTime::at(1_000)).unwrap();

    for _ in 0..4096 {
        assert_eq!(generator.generate_id_by_time(200).unwrap().timestamp(), 200);
    }
    let id = generator.generate_id_by_time(200).unwrap();
    assert_eq!(id.timestamp(), 201);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn timestamp_outside_layout_is_rejected() {
    let epoch = core::time::Duration::from_millis(1_000);
    let options = GeneratorOptions::new(0, 0).with_epoch(epoch);
    let generator = SnowflakeGenerator::new(options, MockTime::at(2_000)).unwrap();

    assert_eq!(
        generator.generate_id_by_time(999),
        Err(Error::TimestampOutOfRange {
            timestamp_ms: 999,
            epoch_ms: 1_000
        })
    );
    let too_far = 1_000 + SnowflakeId::MAX_TIMESTAMP + 1;
    assert!(matches!(
        generator.generate_id_by_time(too_far),
        Err(Error::TimestampOutOfRange { .. })
    ));
    let id = generator.generate_id_by_time(1_000).unwrap();
    assert_eq!(id.timestamp(), 0);
}

#[test]
fn invalid_options_are_rejected() {
    let clock = MockTime::at(42);

    assert_eq!(
        SnowflakeGenerator::new(unix_options(32, 0), clock.clone()).unwrap_err(),
        Error::InvalidDataCenterId { value: 32, max: 31 }
    );
    assert_eq!(
        SnowflakeGenerator::new(unix_options(0, 32), clock.clone()).unwrap_err(),
        Error::InvalidWorkerId { value: 32, max: 31 }
    );
    assert_eq!(
        SnowflakeGenerator::new(unix_options(0, 0).with_sequence(4096), clock.clone())
            .unwrap_err(),
        Error::InvalidSequence {
            value: 4096,
            max: 4095
        }
    );

    let future = GeneratorOptions::new(0, 0).with_epoch(core::time::Duration::from_millis(42));
    assert_eq!(
        SnowflakeGenerator::new(future, clock).unwrap_err(),
        Error::InvalidEpoch {
            epoch_ms: 42,
            now_ms: 42
        }
    );
}

#[test]
fn default_epoch_is_in_the_past() {
    let generator = SnowflakeGenerator::new(GeneratorOptions::new(31, 31), SystemClock).unwrap();
    let id = generator.generate_id().unwrap();
    assert!(id.is_valid());
    assert_eq!(id.data_center_id(), 31);
    assert_eq!(id.worker_id(), 31);
    assert_eq!(generator.epoch_millis(), crate::TWITTER_EPOCH.as_millis() as u64);
}

#[test]
fn system_clock_sequence_is_monotonic() {
    let generator = SnowflakeGenerator::new(GeneratorOptions::new(1, 1), SystemClock).unwrap();
    run_generator_monotonic(&generator);
}

#[test]
fn monotonic_clock_sequence_is_monotonic() {
    let generator =
        SnowflakeGenerator::new(GeneratorOptions::new(1, 1), MonotonicClock::new()).unwrap();
    run_generator_monotonic(&generator);
}

#[test]
fn threaded_generation_is_unique() {
    const THREADS: usize = 8;
    const TOTAL_IDS: usize = 4096 * 64;
    const IDS_PER_THREAD: usize = TOTAL_IDS / THREADS;

    let generator =
        SnowflakeGenerator::new(GeneratorOptions::new(2, 5), MonotonicClock::new()).unwrap();
    let seen_ids = Mutex::new(HashSet::with_capacity(TOTAL_IDS));

    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut local = Vec::with_capacity(IDS_PER_THREAD);
                let mut last = None;
                for _ in 0..IDS_PER_THREAD {
                    let id = generator.generate_id().unwrap();
                    if let Some(last) = last {
                        assert!(id > last);
                    }
                    last = Some(id);
                    local.push(id);
                }
                let mut seen = seen_ids.lock().unwrap();
                for id in local {
                    assert!(seen.insert(id));
                }
            });
        }
    });

    let final_count = seen_ids.lock().unwrap().len();
    assert_eq!(final_count, TOTAL_IDS, "Expected {TOTAL_IDS} unique IDs");
}
