use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use keel_id::{
    GeneratorOptions, MonotonicClock, SerialNumberRegistry, SnowflakeGenerator, SystemClock,
    TimeSource, UNIX_EPOCH_MS,
};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

struct FixedMockTime {
    millis: u64,
}

impl TimeSource for FixedMockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

// Number of IDs generated per benchmark iteration (per-thread for
// multi-threaded). Matches the per-millisecond capacity so a fixed clock never
// has to wait.
const TOTAL_IDS: usize = 4096;

/// Benchmarks the hot path against a fixed clock; the sequence never wraps.
fn bench_generator<T: TimeSource>(
    c: &mut Criterion,
    group_name: &str,
    generator_factory: impl Fn() -> SnowflakeGenerator<T>,
) {
    let mut group = c.benchmark_group(group_name);
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    group.bench_function(format!("elems/{TOTAL_IDS}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let generator = generator_factory();
                for _ in 0..TOTAL_IDS {
                    black_box(generator.generate_id().unwrap());
                }
            }

            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks a shared generator across threads, waiting on real clocks.
fn bench_generator_contended<T: TimeSource + Send + Sync>(
    c: &mut Criterion,
    group_name: &str,
    generator_factory: impl Fn() -> SnowflakeGenerator<T>,
) {
    let mut group = c.benchmark_group(group_name);
    let max_threads = num_cpus::get().max(1);

    for thread_count in [1, 2, 4, 8, 16]
        .into_iter()
        .filter(|count| *count <= max_threads)
    {
        let ids_per_thread = TOTAL_IDS / thread_count;

        group.throughput(Throughput::Elements(TOTAL_IDS as u64));
        group.bench_function(
            format!("elems/{TOTAL_IDS}/threads/{thread_count}"),
            |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();

                    for _ in 0..iters {
                        let generator = Arc::new(generator_factory());
                        let barrier = Arc::new(Barrier::new(thread_count + 1));
                        scope(|s| {
                            for _ in 0..thread_count {
                                let generator = Arc::clone(&generator);
                                let barrier = Arc::clone(&barrier);
                                s.spawn(move || {
                                    barrier.wait();
                                    for _ in 0..ids_per_thread {
                                        black_box(generator.generate_id().unwrap());
                                    }
                                });
                            }
                            barrier.wait();
                        });
                    }

                    start.elapsed()
                });
            },
        );
    }

    group.finish();
}

fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");
    group.throughput(Throughput::Elements(TOTAL_IDS as u64));

    let registry = SerialNumberRegistry::new().unwrap();
    registry
        .register_generator(["orders"], GeneratorOptions::new(1, 2))
        .unwrap();

    group.bench_function("registered", |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(registry.generate_serial_number(Some("orders")).unwrap());
            }
        });
    });
    group.bench_function("default", |b| {
        b.iter(|| {
            for _ in 0..TOTAL_IDS {
                black_box(registry.generate_serial_number(None).unwrap());
            }
        });
    });

    group.finish();
}

fn benchmarks(c: &mut Criterion) {
    bench_generator(c, "generator/fixed", || {
        SnowflakeGenerator::new(
            GeneratorOptions::new(1, 1).with_epoch(UNIX_EPOCH_MS),
            FixedMockTime { millis: 1 },
        )
        .unwrap()
    });

    let clock = MonotonicClock::new();
    bench_generator_contended(c, "generator/monotonic", || {
        SnowflakeGenerator::new(GeneratorOptions::new(1, 1), clock.clone()).unwrap()
    });
    bench_generator_contended(c, "generator/system", || {
        SnowflakeGenerator::new(GeneratorOptions::new(1, 1), SystemClock).unwrap()
    });

    bench_registry(c);
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
