//! Append-path benchmarks.
//!
//! Measures claim/commit throughput for a single producer and under
//! producer contention. The consumer is left idle: the claim path is the
//! contended hot path and rotation plus cleaning keep the ring reusable
//! without it.

#![allow(missing_docs)]

use std::time::Instant;

use criterion::{
    black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput,
};
use tempfile::TempDir;

use plume_log::{AppendLog, AppendLogConfig};

fn setup_log() -> (AppendLog, TempDir) {
    let tempdir = tempfile::tempdir().expect("failed to create temp dir");
    let config = AppendLogConfig::new(tempdir.path().join("bench.log"));
    let log = AppendLog::open(config).expect("failed to open log");
    (log, tempdir)
}

/// Single-producer claim/commit throughput across payload sizes.
fn bench_claim_commit(c: &mut Criterion) {
    let payload_sizes = vec![32usize, 256, 1024, 4096];

    let mut group = c.benchmark_group("claim_commit");
    for &size in &payload_sizes {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("payload", size), &size, |b, &size| {
            let (log, _tmp) = setup_log();
            let payload = vec![0u8; size];

            b.iter(|| {
                let mut claim = log.claim(size as u32).expect("claim failed");
                claim.payload_mut().copy_from_slice(&payload);
                black_box(claim).commit();
            });
        });
    }
    group.finish();
}

/// Aggregate append throughput with contending producers.
fn bench_contended_append(c: &mut Criterion) {
    let producer_counts = vec![1usize, 2, 4];
    let payload_size = 256usize;

    let mut group = c.benchmark_group("contended_append");
    for &producers in &producer_counts {
        group.throughput(Throughput::Elements(producers as u64));
        group.bench_with_input(
            BenchmarkId::new("producers", producers),
            &producers,
            |b, &producers| {
                let (log, _tmp) = setup_log();
                let payload = vec![0u8; payload_size];

                b.iter_custom(|iters| {
                    let per_producer = iters / producers as u64 + 1;
                    let start = Instant::now();
                    std::thread::scope(|scope| {
                        for _ in 0..producers {
                            let log = &log;
                            let payload = &payload;
                            scope.spawn(move || {
                                for _ in 0..per_producer {
                                    log.append(payload).expect("append failed");
                                }
                            });
                        }
                    });
                    start.elapsed()
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_claim_commit, bench_contended_append);
criterion_main!(benches);
