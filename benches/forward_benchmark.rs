use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hmmsuite::{backward, forward, Model};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

fn setup(num_states: usize, len: usize) -> (Model, Vec<usize>) {
    let mut rng = Xoshiro256StarStar::seed_from_u64(42);
    let states: Vec<String> = (0..num_states).map(|i| format!("s{i}")).collect();
    let symbols: Vec<String> = (0..16).map(|i| format!("o{i}")).collect();
    let model = Model::random(&states[..], &symbols[..], &mut rng).expect("failed to create model");
    let (_, obs) = model.sample(len, &mut rng).expect("failed to sample");
    (model, obs)
}

fn forward_benchmark(c: &mut Criterion) {
    let (model, obs) = setup(16, 1000);
    c.bench_function("forward", |b| {
        b.iter(|| forward(black_box(&model), black_box(&obs)).expect("forward failed"))
    });
    c.bench_function("backward", |b| {
        b.iter(|| backward(black_box(&model), black_box(&obs)).expect("backward failed"))
    });
}

criterion_group! {
    name = benchmarks;
    config = Criterion::default().measurement_time(Duration::from_secs(10));
    targets = forward_benchmark
}

criterion_main!(benchmarks);
