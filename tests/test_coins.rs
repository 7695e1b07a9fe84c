use hmmsuite::{forward, reestimate, viterbi, Model};

fn coins() -> Model {
    Model::new(
        &["Coin1", "Coin2", "Coin3"],
        &["Heads", "Tails"],
        vec![0.4, 0.3, 0.3],
        vec![0.6, 0.3, 0.1, 0.2, 0.5, 0.3, 0.3, 0.2, 0.5],
        vec![0.7, 0.3, 0.3, 0.7, 0.5, 0.5],
    )
    .unwrap()
}

#[test]
fn test_three_heads() {
    let model = coins();
    let obs = model.observations(&["Heads", "Heads", "Heads"]).unwrap();

    let fwd = forward(&model, &obs).unwrap();
    assert!((fwd.probability - 0.14534).abs() < 1e-9, "{}", fwd.probability);

    let best = viterbi(&model, &obs).unwrap();
    assert!((best.probability - 0.049392).abs() < 1e-9, "{}", best.probability);
    assert_eq!(model.state_labels(&best.path), vec!["Coin1", "Coin1", "Coin1"]);
}

#[test]
fn test_reestimate_raises_best_path() {
    let model = coins();
    let obs = model.observations(&["Heads", "Heads", "Heads"]).unwrap();
    let before = viterbi(&model, &obs).unwrap();

    let next = reestimate(&model, &obs).unwrap();
    let after = viterbi(&next, &obs).unwrap();
    assert!(after.probability > before.probability);
    assert!((after.probability - 0.339472).abs() < 1e-6, "{}", after.probability);
    assert_eq!(after.path, vec![0, 0, 0]);

    // Only heads were seen, so every coin now always shows heads.
    for s in 0..3 {
        assert!((next.emission(s, 0) - 1.0).abs() < 1e-12);
        assert_eq!(next.emission(s, 1), 0.0);
    }
    let fwd = forward(&next, &obs).unwrap();
    assert!((fwd.probability - 1.0).abs() < 1e-9, "{}", fwd.probability);

    let tails = next.observations(&["Tails"]).unwrap();
    assert_eq!(forward(&next, &tails).unwrap().probability, 0.0);
}

#[test]
fn test_reestimated_rows_are_distributions() {
    let model = coins();
    let obs = model
        .observations(&["Heads", "Tails", "Tails", "Heads", "Tails"])
        .unwrap();
    let next = reestimate(&model, &obs).unwrap();
    let sum: f64 = next.initial_probabilities().iter().sum();
    assert!((sum - 1.0).abs() < 1e-9);
    for s in 0..3 {
        let sum: f64 = next.transition_row(s).iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "transition row {s}: {sum}");
        let sum: f64 = next.emission_row(s).iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "emission row {s}: {sum}");
    }
}
