//! XOR masking throughput benchmarks.
//!
//! Measures device-path and host-reference throughput in bytes/s over
//! 1MB and 16MB payloads. The device group is skipped (with a note)
//! when no OpenCL device is available.
//!
//! All groups enforce warm_up_time(2s) + measurement_time(5s) +
//! sample_size(10) to keep total runtime bounded.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use clxor::engine::XorEngine;
use clxor::xor;

const SIZES: &[usize] = &[1 << 20, 16 << 20];
const KEY: &[u8] = b"0123456789abcdef";

/// Apply standard timeout caps to a benchmark group.
fn cap(group: &mut criterion::BenchmarkGroup<criterion::measurement::WallTime>) {
    group.warm_up_time(Duration::from_secs(2));
    group.measurement_time(Duration::from_secs(5));
    group.sample_size(10);
}

/// Synthetic payload of the requested size.
fn test_data(size: usize) -> Vec<u8> {
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    let mut data = Vec::with_capacity(size);
    while data.len() < size {
        let remaining = size - data.len();
        let chunk = remaining.min(pattern.len());
        data.extend_from_slice(&pattern[..chunk]);
    }
    data
}

fn bench_device(c: &mut Criterion) {
    let engine = match XorEngine::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("skipping device benchmarks: {e}");
            return;
        }
    };
    eprintln!("device: {}", engine.device_name());

    let mut group = c.benchmark_group("xor_device");
    cap(&mut group);
    for &size in SIZES {
        let data = test_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}MB", size >> 20)),
            &data,
            |b, data| b.iter(|| engine.apply(data, KEY).unwrap()),
        );
    }
    group.finish();
}

fn bench_host(c: &mut Criterion) {
    let mut group = c.benchmark_group("xor_host");
    cap(&mut group);
    for &size in SIZES {
        let data = test_data(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}MB", size >> 20)),
            &data,
            |b, data| b.iter(|| xor::xor_with_key(data, KEY).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_device, bench_host);
criterion_main!(benches);
