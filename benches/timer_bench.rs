//! Benchmarks for the timer scheduler.
//!
//! Benchmarks cover:
//! - Registration (add) at various heap sizes
//! - A full process sweep firing every entry
//! - Handle validation (legal) against a populated arena
//! - Cancellation storms that trip the amortized purge

// `criterion_group!` expands to undocumented public items.
#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::rc::Rc;

use tickbase::{TimerHandle, TimerHandler, Timers, Timers32};

struct Noop;

impl TimerHandler<u32> for Noop {
    fn handle_timeout(&self, _timers: &mut Timers<u32>, _handle: TimerHandle, _user: ()) {}
}

fn populated(n: u32) -> Timers32 {
    let handler: Rc<dyn TimerHandler<u32>> = Rc::new(Noop);
    let mut timers = Timers32::new();
    for i in 0..n {
        // Spread due times so heap shape is realistic, not sorted input.
        timers.add(i.wrapping_mul(2_654_435_761) % 1_000_000, 0, Rc::clone(&handler), ());
    }
    timers
}

fn bench_timer_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer_add");
    for size in [100u32, 1_000, 10_000] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let handler: Rc<dyn TimerHandler<u32>> = Rc::new(Noop);
            b.iter(|| {
                let mut timers = Timers32::new();
                for i in 0..size {
                    black_box(timers.add(black_box(i), 0, Rc::clone(&handler), ()));
                }
                timers
            });
        });
    }
    group.finish();
}

fn bench_timer_process_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer_process_sweep");
    for size in [100u32, 1_000, 10_000] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || populated(size),
                |mut timers| {
                    black_box(timers.process(1_000_000));
                    timers
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_timer_legal(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer_legal");
    let handler: Rc<dyn TimerHandler<u32>> = Rc::new(Noop);
    let mut timers = Timers32::new();
    let handles: Vec<TimerHandle> = (0..10_000u32)
        .map(|i| timers.add(i, 0, Rc::clone(&handler), ()))
        .collect();

    group.throughput(Throughput::Elements(handles.len() as u64));
    group.bench_function("validate_10k_handles", |b| {
        b.iter(|| {
            let mut live = 0usize;
            for handle in &handles {
                if timers.legal(black_box(*handle)) {
                    live += 1;
                }
            }
            black_box(live)
        });
    });
    group.finish();
}

fn bench_timer_cancel_storm(c: &mut Criterion) {
    let mut group = c.benchmark_group("timer_cancel_storm");
    for size in [1_000u32, 10_000] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let handler: Rc<dyn TimerHandler<u32>> = Rc::new(Noop);
            b.iter_batched(
                || {
                    let mut timers = Timers32::new();
                    let handles: Vec<TimerHandle> = (0..size)
                        .map(|i| timers.add(i, 0, Rc::clone(&handler), ()))
                        .collect();
                    (timers, handles)
                },
                |(mut timers, handles)| {
                    // Cancelling most of the heap crosses the purge threshold
                    // several times.
                    for handle in handles {
                        timers.cancel(handle);
                    }
                    timers
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_timer_add,
    bench_timer_process_sweep,
    bench_timer_legal,
    bench_timer_cancel_storm
);
criterion_main!(benches);
