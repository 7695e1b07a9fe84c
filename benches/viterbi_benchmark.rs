use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hmmsuite::{viterbi, Model};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

fn viterbi_benchmark(c: &mut Criterion) {
    let mut rng = Xoshiro256StarStar::seed_from_u64(7);
    let states: Vec<String> = (0..16).map(|i| format!("s{i}")).collect();
    let symbols: Vec<String> = (0..16).map(|i| format!("o{i}")).collect();
    let model = Model::random(&states[..], &symbols[..], &mut rng).expect("failed to create model");
    let (_, obs) = model.sample(1000, &mut rng).expect("failed to sample");
    c.bench_function("viterbi", |b| {
        b.iter(|| viterbi(black_box(&model), black_box(&obs)).expect("viterbi failed"))
    });
}

criterion_group!(benchmarks, viterbi_benchmark);
criterion_main!(benchmarks);
