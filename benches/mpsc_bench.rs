use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};
use criterion::{Criterion, BenchmarkId, criterion_main, criterion_group};
use chunked_queues::mpsc;

const QUEUE_SIZE: usize = 100000;

fn bench_mpsc_offer_poll(iters: u64, writers_thread_count: usize, initial_capacity: usize) -> Duration{
    let writer_chunk = QUEUE_SIZE / writers_thread_count;

    let mut total = Duration::ZERO;
    for _ in 0..iters {
        let (producer, mut consumer) = mpsc::chunked::<usize>(initial_capacity, 8192).unwrap();

        let start = Instant::now();

            // write
            let mut writer_threads = Vec::new();
            for thread_id in 0..writers_thread_count{
                let producer = producer.clone();
                let thread = Box::new(thread::spawn(move || {
                    let from = thread_id * writer_chunk;
                    let to   = from + writer_chunk;
                    for i in from..to {
                        let mut value = black_box(i);
                        while let Err(full) = producer.offer(value) {
                            value = full.into_inner();
                            std::hint::spin_loop();
                        }
                    }
                }));
                writer_threads.push(thread);
            }

            // read
            let mut received = 0;
            while received < writer_chunk * writers_thread_count {
                if let Some(value) = consumer.poll() {
                    black_box(value);
                    received += 1;
                }
            }

            for thread in writer_threads {
                thread.join().unwrap();
            }

        total += start.elapsed();
    }
    total
}

pub fn mpsc_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("mpsc offer/poll");
    for writers_thread_count in [1, 2, 4, 8] {
        for initial_capacity in [64, 1024] {
            group.bench_with_input(
                BenchmarkId::new(format!("chunk {initial_capacity}"), writers_thread_count),
                &writers_thread_count,
                |b, &writers| b.iter_custom(|iters| bench_mpsc_offer_poll(iters, writers, initial_capacity))
            );
        }
    }
}

criterion_group!(benches, mpsc_benchmark);
criterion_main!(benches);
