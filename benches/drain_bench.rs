use std::hint::black_box;
use std::time::{Duration, Instant};
use criterion::{Criterion, criterion_main, criterion_group};
use chunked_queues::{mpsc, spsc};

const QUEUE_SIZE: usize = 4096;

/// Single thread. Queue pre-filled, only the read side is measured.
fn bench_mpsc_drain(iters: u64) -> Duration{
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let (producer, mut consumer) = mpsc::chunked::<usize>(256, QUEUE_SIZE).unwrap();
        producer.fill_all(|| black_box(1));

        let start = Instant::now();
            let mut sum = 0;
            consumer.drain_all(|value| sum += value);
            black_box(sum);
        total += start.elapsed();
    }
    total
}

fn bench_mpsc_poll(iters: u64) -> Duration{
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let (producer, mut consumer) = mpsc::chunked::<usize>(256, QUEUE_SIZE).unwrap();
        producer.fill_all(|| black_box(1));

        let start = Instant::now();
            let mut sum = 0;
            while let Some(value) = consumer.poll() {
                sum += value;
            }
            black_box(sum);
        total += start.elapsed();
    }
    total
}

fn bench_spsc_drain(iters: u64) -> Duration{
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let (mut producer, mut consumer) = spsc::queue::<usize>(QUEUE_SIZE).unwrap();
        producer.fill_all(|| black_box(1));

        let start = Instant::now();
            let mut sum = 0;
            consumer.drain_all(|value| sum += value);
            black_box(sum);
        total += start.elapsed();
    }
    total
}

pub fn drain_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain");
    group.bench_function("mpsc drain_all", |b|b.iter_custom(|iters| bench_mpsc_drain(iters)));
    group.bench_function("mpsc poll loop", |b|b.iter_custom(|iters| bench_mpsc_poll(iters)));
    group.bench_function("spsc drain_all", |b|b.iter_custom(|iters| bench_spsc_drain(iters)));
}

criterion_group!(benches, drain_benchmark);
criterion_main!(benches);
