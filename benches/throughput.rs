use anvilq::prelude::*;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const TASKS: usize = 1_000;

async fn submit_and_drain<P: ConcurrencyPolicy>(queue: &AsyncTaskQueue<P>) -> usize {
    let handles: Vec<_> = (0..TASKS)
        .map(|n| queue.add_to_queue(move || async move { Ok(black_box(n)) }))
        .collect();

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap_or_default();
    }
    total
}

fn ring_benchmark(c: &mut Criterion) {
    c.bench_function("ring_enqueue_dequeue", |b| {
        b.iter(|| {
            let mut ring = IndexKeyedRing::new();
            for n in 0..TASKS {
                ring.enqueue(n);
            }
            while let Some(n) = ring.dequeue() {
                black_box(n);
            }
        })
    });
}

fn queue_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime");

    let mut group = c.benchmark_group("queue_throughput");

    group.bench_function("serial", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let queue = SerialQueue::new();
                black_box(submit_and_drain(&queue).await)
            })
        })
    });

    for limit in [2usize, 8, 32] {
        group.bench_with_input(BenchmarkId::new("bounded", limit), &limit, |b, &limit| {
            b.iter(|| {
                runtime.block_on(async {
                    let queue = BoundedConcurrencyQueue::new(limit).expect("positive limit");
                    black_box(submit_and_drain(&queue).await)
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, ring_benchmark, queue_benchmark);
criterion_main!(benches);
