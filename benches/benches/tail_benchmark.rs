//! Log scraping benchmarks.
//!
//! Run with: `cargo bench --package reconbridge-bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use reconbridge_bench::{LogShape, chunked, synthetic_log};
use reconbridge_jobs::{LogPatterns, LogSink, LogTailer};
use std::hint::black_box;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

fn scan_benchmark(c: &mut Criterion) {
    let patterns = LogPatterns::default();
    let mut group = c.benchmark_group("scan");

    for images in [100, 1_000, 10_000] {
        let log = synthetic_log(LogShape {
            images,
            ..LogShape::default()
        });
        group.throughput(Throughput::Bytes(log.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(images), &log, |b, log| {
            b.iter(|| patterns.scan(black_box(log.as_bytes())));
        });
    }

    group.finish();
}

fn feed_benchmark(c: &mut Criterion) {
    let log = synthetic_log(LogShape {
        images: 2_000,
        ..LogShape::default()
    });
    let mut group = c.benchmark_group("feed");
    group.throughput(Throughput::Bytes(log.len() as u64));

    // Chunk sizes roughly matching what a 100 ms poll picks up from a busy tool.
    for chunk_size in [256, 4 * 1024, 64 * 1024] {
        let chunks = chunked(log.as_bytes(), chunk_size);
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunks,
            |b, chunks| {
                b.iter(|| {
                    let mut tailer =
                        LogTailer::new(PathBuf::from("unused.log"), LogPatterns::default());
                    for chunk in chunks {
                        black_box(tailer.feed(chunk));
                    }
                });
            },
        );
    }

    group.finish();
}

fn poll_benchmark(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let sink = LogSink::create(temp_dir.path().join("sink.log")).unwrap();
    let chunk = synthetic_log(LogShape {
        images: 20,
        ..LogShape::default()
    });

    let mut group = c.benchmark_group("poll");
    group.throughput(Throughput::Bytes(chunk.len() as u64));
    group.bench_function("append_then_poll", |b| {
        let mut tailer = sink.tailer(LogPatterns::default());
        let mut writer = sink.writer().unwrap();
        b.iter(|| {
            writer.write_all(chunk.as_bytes()).unwrap();
            black_box(tailer.poll());
        });
    });
    group.finish();
}

criterion_group!(benches, scan_benchmark, feed_benchmark, poll_benchmark);
criterion_main!(benches);
