use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};
use criterion::{Criterion, criterion_main, criterion_group};
use chunked_queues::spsc;

const QUEUE_SIZE: usize = 100000;

/// One writer thread, reader on the bench thread.
fn bench_offer_poll(iters: u64, capacity: usize) -> Duration{
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let (mut producer, mut consumer) = spsc::queue::<usize>(capacity).unwrap();

        let start = Instant::now();

            let writer = thread::spawn(move || {
                for i in 0..QUEUE_SIZE {
                    let mut value = black_box(i);
                    while let Err(full) = producer.offer(value) {
                        value = full.into_inner();
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0;
            while received < QUEUE_SIZE {
                if let Some(value) = consumer.poll() {
                    black_box(value);
                    received += 1;
                }
            }
            writer.join().unwrap();

        total += start.elapsed();
    }
    total
}

fn bench_fill_drain(iters: u64, capacity: usize) -> Duration{
    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let (mut producer, mut consumer) = spsc::queue::<usize>(capacity).unwrap();

        let start = Instant::now();

            let writer = thread::spawn(move || {
                let mut sent = 0;
                while sent < QUEUE_SIZE {
                    sent += producer.fill(|| black_box(1), QUEUE_SIZE - sent);
                }
            });

            let mut received = 0;
            while received < QUEUE_SIZE {
                received += consumer.drain(|value| { black_box(value); }, QUEUE_SIZE - received);
            }
            writer.join().unwrap();

        total += start.elapsed();
    }
    total
}

pub fn spsc_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    for capacity in [128, 4096] {
        group.bench_function(format!("offer/poll capacity {capacity}"), |b|b.iter_custom(|iters| bench_offer_poll(iters, capacity)));
        group.bench_function(format!("fill/drain capacity {capacity}"), |b|b.iter_custom(|iters| bench_fill_drain(iters, capacity)));
    }
}

criterion_group!(benches, spsc_benchmark);
criterion_main!(benches);
