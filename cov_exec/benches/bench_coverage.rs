//! # Coverage Benchmark

use criterion::{criterion_group, criterion_main, Criterion};

use cov_lib::{
    histogram::{histogram_1d, histogram_2d},
    road::RoadModel,
    sampler::{SamplerParams, TelemetryFrame, TelemetrySampler},
};
use nalgebra::{Point2, Vector3};

fn histogram_benchmark(c: &mut Criterion) {
    // Deterministic samples spread over, and slightly beyond, the steering range
    let xs: Vec<f64> = (0..100_000)
        .map(|i| ((i as f64) * 0.37).sin() * 1.1)
        .collect();
    let ys: Vec<f64> = (0..100_000)
        .map(|i| 50.0 + ((i as f64) * 0.011).cos() * 60.0)
        .collect();

    c.bench_function("histogram_1d", |b| {
        b.iter(|| histogram_1d(&xs, 16, (-1.0, 1.0)).unwrap())
    });

    c.bench_function("histogram_2d", |b| {
        b.iter(|| histogram_2d(&xs, &ys, 16, (-1.0, 1.0), (0.0, 100.0)).unwrap())
    });
}

fn sampler_benchmark(c: &mut Criterion) {
    // ---- Build a winding road and a run which weaves across it ----

    let points: Vec<Point2<f64>> = (0..200)
        .map(|i| {
            let x = i as f64 * 2.0;
            Point2::new(x, (x * 0.05).sin() * 20.0)
        })
        .collect();
    let road = RoadModel::new(points, 8.0).unwrap();

    let frames: Vec<TelemetryFrame> = (0..4000)
        .map(|i| {
            let x = i as f64 * 0.1;
            let y = (x * 0.05).sin() * 20.0 + (x * 0.5).sin() * 4.0;
            TelemetryFrame {
                position_m: Vector3::new(x, y, 0.0),
                velocity_ms: Vector3::new(10.0, (x * 0.5).cos() * 20.0, 0.0),
                steering_input: (x * 0.5).cos(),
                throttle_input: 0.5,
                brake_input: 0.0,
            }
        })
        .collect();

    // Every departure in the run must reach the road, otherwise error paths are being timed
    let mut sampler = TelemetrySampler::new(road.clone(), SamplerParams::default()).unwrap();
    for frame in frames.iter() {
        sampler.collect(frame).unwrap();
    }
    assert!(!sampler.departures().is_empty());

    c.bench_function("TelemetrySampler::collect", |b| {
        b.iter(|| {
            let mut sampler = TelemetrySampler::new(road.clone(), SamplerParams::default()).unwrap();
            let num_errors = frames
                .iter()
                .filter(|frame| sampler.collect(frame).is_err())
                .count();
            (sampler.num_samples(), num_errors)
        })
    });
}

criterion_group!(benches, histogram_benchmark, sampler_benchmark);
criterion_main!(benches);
