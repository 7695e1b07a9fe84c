use hmmsuite::{
    backward, forward, posteriors, reestimate, viterbi, Error, Model, Params, Trainer,
    TrainingOptions,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

const STATES: [&str; 3] = ["a", "b", "c"];
const SYMBOLS: [&str; 4] = ["w", "x", "y", "z"];

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Seeded random models and sequences sampled from them.
fn cases(count: u64, len: usize) -> Vec<(Model, Vec<usize>)> {
    (0..count)
        .map(|seed| {
            let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
            let model = Model::random(&STATES, &SYMBOLS, &mut rng).unwrap();
            let (_, obs) = model.sample(len, &mut rng).unwrap();
            (model, obs)
        })
        .collect()
}

#[test]
fn test_forward_agrees_with_backward() {
    for (model, obs) in cases(20, 30) {
        let fwd = forward(&model, &obs).unwrap();
        let bwd = backward(&model, &obs).unwrap();
        let tol = 1e-9 * fwd.log_probability.abs().max(1.0);
        assert!(
            (fwd.log_probability - bwd.log_probability).abs() < tol,
            "{} vs {}",
            fwd.log_probability,
            bwd.log_probability
        );
    }
}

#[test]
fn test_viterbi_bounded_by_forward() {
    for (model, obs) in cases(20, 12) {
        let fwd = forward(&model, &obs).unwrap();
        let best = viterbi(&model, &obs).unwrap();
        assert!(best.log_probability <= fwd.log_probability + 1e-12);
        assert_eq!(best.path.len(), obs.len());
        assert!(best.path.iter().all(|&s| s < STATES.len()));
    }
}

#[test]
fn test_occupancy_is_a_distribution() {
    for (model, obs) in cases(10, 15) {
        let post = posteriors(&model, &obs).unwrap();
        assert_eq!(post.len(), obs.len());
        for t in 0..obs.len() {
            let sum: f64 = (0..STATES.len()).map(|s| post.occupancy(s, t)).sum();
            assert!((sum - 1.0).abs() < 1e-9, "t = {t}: {sum}");
        }
    }
}

#[test]
fn test_single_observation() {
    for (model, obs) in cases(5, 1) {
        let fwd = forward(&model, &obs).unwrap();
        let expected: f64 = (0..STATES.len())
            .map(|s| model.initial(s) * model.emission(s, obs[0]))
            .sum();
        assert!((fwd.probability - expected).abs() < 1e-12);
        assert!((backward(&model, &obs).unwrap().probability - expected).abs() < 1e-12);
        let next = reestimate(&model, &obs).unwrap();
        assert!(next.transition_row(0).iter().all(|&p| p == 0.0));
    }
}

#[test]
fn test_likelihood_never_decreases() {
    init_logger();
    for (model, obs) in cases(5, 40) {
        let training = Trainer::new(TrainingOptions {
            max_iterations: 20,
            epsilon: 0.0,
            ..Default::default()
        })
        .train(&model, &obs)
        .unwrap();
        for pair in training.log_likelihoods.windows(2) {
            assert!(pair[1] >= pair[0] - 1e-9, "{} -> {}", pair[0], pair[1]);
        }
    }
}

#[test]
fn test_converges() {
    init_logger();
    let (model, obs) = cases(1, 50).remove(0);
    let training = Trainer::new(TrainingOptions {
        max_iterations: 1000,
        epsilon: 1e-4,
        ..Default::default()
    })
    .train(&model, &obs)
    .unwrap();
    assert!(training.converged);
    assert!(training.iterations < 1000);
    assert_eq!(training.log_likelihoods.len(), training.iterations + 1);
}

#[test]
fn test_fixed_point_stays_put() {
    // Deterministic chain: a -> b -> a ..., a emits x, b emits y.
    let model = Model::new(
        &["a", "b"],
        &["x", "y"],
        vec![1.0, 0.0],
        vec![0.0, 1.0, 1.0, 0.0],
        vec![1.0, 0.0, 0.0, 1.0],
    )
    .unwrap();
    let obs = model.observations(&["x", "y", "x", "y", "x"]).unwrap();
    let next = reestimate(&model, &obs).unwrap();
    assert_eq!(next.initial_probabilities(), model.initial_probabilities());
    for s in 0..2 {
        assert_eq!(next.transition_row(s), model.transition_row(s));
        assert_eq!(next.emission_row(s), model.emission_row(s));
    }
}

#[test]
fn test_emission_only_training() {
    let (model, obs) = cases(3, 25).remove(2);
    let mut options = TrainingOptions::default();
    options.set("params", "e").unwrap();
    options.set("max_iterations", "3").unwrap();
    let training = Trainer::new(options).train(&model, &obs).unwrap();
    assert_eq!(options.params, Params::EMISSION);
    assert_eq!(
        training.model.initial_probabilities(),
        model.initial_probabilities()
    );
    assert_eq!(training.model.transition_row(1), model.transition_row(1));
}

#[test]
fn test_long_sequence_stays_finite() {
    let (model, obs) = cases(1, 5000).remove(0);
    let fwd = forward(&model, &obs).unwrap();
    assert!(fwd.log_probability.is_finite());
    assert_eq!(fwd.probability, 0.0);
    assert!(matches!(
        fwd.checked_probability(),
        Err(Error::NumericInstability(..))
    ));
    let post = posteriors(&model, &obs).unwrap();
    assert!((post.log_probability - fwd.log_probability).abs() < 1e-9 * fwd.log_probability.abs());
    let next = reestimate(&model, &obs).unwrap();
    assert!(forward(&next, &obs).unwrap().log_probability >= fwd.log_probability);
}
