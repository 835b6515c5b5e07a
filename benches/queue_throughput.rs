//! Benchmarks for delivery queue operations
//!
//! Measures the producer-side cost of the bounded queue:
//! - push into a queue with headroom, matched by a pop
//! - push that displaces the oldest package
//! - fixed-capacity payload construction
//!
//! The push path runs inside the frame callback, so it has to stay cheap.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use meterflow::test_utils::sample_package;
use meterflow::{DeliveryQueue, PAYLOAD_CAPACITY, PackagePayload};
use std::hint::black_box;

fn bench_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_push_pop");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_then_pop", |b| {
        let queue = DeliveryQueue::new(64);
        b.iter(|| {
            queue.push(black_box(sample_package(7))).expect("push should not time out");
            black_box(queue.pop())
        })
    });

    group.finish();
}

fn bench_push_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_eviction");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_into_full_queue", |b| {
        let queue = DeliveryQueue::new(8);
        for tag in 0..8 {
            queue.push(sample_package(tag)).expect("push should not time out");
        }

        // Every push from here on displaces the oldest package.
        b.iter(|| {
            let evicted =
                queue.push(black_box(sample_package(9))).expect("push should not time out");
            black_box(evicted)
        })
    });

    group.finish();
}

fn bench_payload_construction(c: &mut Criterion) {
    let bytes = vec![0xA5u8; PAYLOAD_CAPACITY];

    let mut group = c.benchmark_group("payload_construction");
    group.throughput(Throughput::Bytes(PAYLOAD_CAPACITY as u64));

    group.bench_function("from_slice_at_capacity", |b| {
        b.iter(|| {
            let payload = PackagePayload::from_slice(black_box(&bytes))
                .expect("payload at capacity should fit");
            black_box(payload)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_push_pop, bench_push_with_eviction, bench_payload_construction);
criterion_main!(benches);
