use super::model::Model;
use crate::Result;

/// The most likely state path and its joint probability with the
/// observations.
#[derive(Debug, Clone, PartialEq)]
pub struct ViterbiPath {
    pub probability: f64,
    pub log_probability: f64,
    pub path: Vec<usize>,
}

/// Columns whose maximum falls below this are multiplied by [`RESCALE`].
const RESCALE_BELOW: f64 = 1.0 / RESCALE;
/// 2^256. Multiplying by a power of two is exact, so rescaled products
/// compare exactly like the unscaled ones.
const RESCALE: f64 = 1.157_920_892_373_162e77;
const RESCALE_LOG2: i32 = 256;

/// Index and value of the maximum; the first maximum wins on ties, and
/// index 0 is returned when every value is zero.
#[inline]
fn argmax<I: Iterator<Item = f64>>(scores: I) -> (usize, f64) {
    let mut best = (0, 0.0);
    for (i, score) in scores.enumerate() {
        if score > best.1 {
            best = (i, score);
        }
    }
    best
}

/// Finds the single most likely state path for `observations`.
///
/// Candidates are compared as linear products
/// `δ[i][t-1] * transition[i][j] * emission[j][o_t]` with a strict `>`, so
/// when several predecessors (or final states) reach exactly the same
/// maximum, the lowest state index wins. A column that gets too small is
/// rescaled by 2^256 and the shift is accounted for in `log_probability`.
pub fn viterbi(model: &Model, observations: &[usize]) -> Result<ViterbiPath> {
    model.check_observations(observations)?;
    let n = model.num_states();
    let t_len = observations.len();

    /*
    delta is a [T][N] matrix whose element [t][j] is the best (rescaled)
    score of a path arriving at (t, j); backward_edge[t][j] is the label #i
    at t-1 on that path.
    */
    let mut delta = vec![0.0; t_len * n];
    let mut backward_edge = vec![0usize; t_len * n];
    /* Number of binary orders of magnitude the scores were shifted up. */
    let mut shift = 0i32;

    /* Compute the scores at (0, *). */
    let o0 = observations[0];
    for j in 0..n {
        delta[j] = model.initial(j) * model.emission(j, o0);
    }
    shift += rescale(&mut delta[..n]);

    /* Compute the scores at (t, *). */
    for t in 1..t_len {
        let ot = observations[t];
        let (done, rest) = delta.split_at_mut(n * t);
        let prev = &done[n * (t - 1)..];
        let cur = &mut rest[..n];
        for j in 0..n {
            /* Transit from (t-1, i) to (t, j) and emit o_t. */
            let e = model.emission(j, ot);
            let (argmax_i, max_score) =
                argmax((0..n).map(|i| prev[i] * model.transition(i, j) * e));
            /* Backward link (#t, #j) -> (#t-1, #i). */
            backward_edge[n * t + j] = argmax_i;
            cur[j] = max_score;
        }
        shift += rescale(cur);
    }

    /* Find the node (#T, #i) that reaches EOS with the maximum score. */
    let (last, best) = argmax(delta[n * (t_len - 1)..].iter().copied());

    /* Tag labels by tracing the backward links. */
    let mut path = vec![0; t_len];
    path[t_len - 1] = last;
    for t in (0..t_len - 1).rev() {
        path[t] = backward_edge[n * (t + 1) + path[t + 1]];
    }

    let (probability, log_probability) = if best == 0.0 {
        (0.0, f64::NEG_INFINITY)
    } else if shift == 0 {
        (best, best.ln())
    } else {
        let log_probability = best.ln() - f64::from(shift) * std::f64::consts::LN_2;
        (log_probability.exp(), log_probability)
    };
    Ok(ViterbiPath {
        probability,
        log_probability,
        path,
    })
}

/// Scales `column` up by powers of two while its maximum is tiny; returns
/// the number of binary orders of magnitude applied.
fn rescale(column: &mut [f64]) -> i32 {
    let mut shift = 0;
    let mut max = column.iter().copied().fold(0.0, f64::max);
    while max > 0.0 && max < RESCALE_BELOW {
        column.iter_mut().for_each(|x| *x *= RESCALE);
        max *= RESCALE;
        shift += RESCALE_LOG2;
    }
    shift
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn weather() -> Model {
        Model::new(
            &["rainy", "sunny"],
            &["walk", "shop", "clean"],
            vec![0.6, 0.4],
            vec![0.7, 0.3, 0.4, 0.6],
            vec![0.1, 0.4, 0.5, 0.6, 0.3, 0.1],
        )
        .unwrap()
    }

    #[test]
    fn weather_path() {
        let model = weather();
        let obs = model.observations(&["walk", "shop", "clean"]).unwrap();
        let best = viterbi(&model, &obs).unwrap();
        assert!((best.probability - 0.01344).abs() < 1e-12, "{}", best.probability);
        assert_eq!(model.state_labels(&best.path), vec!["sunny", "rainy", "rainy"]);
    }

    #[test]
    fn first_maximum_wins() {
        // Every path has the same probability.
        let model = Model::new(
            &["a", "b", "c"],
            &["x"],
            vec![1.0 / 3.0; 3],
            vec![1.0 / 3.0; 9],
            vec![1.0; 3],
        )
        .unwrap();
        let best = viterbi(&model, &[0, 0, 0, 0]).unwrap();
        assert_eq!(best.path, vec![0, 0, 0, 0]);
    }

    #[test]
    fn tie_only_among_later_states() {
        // b and c are tied and both beat a; b is declared first.
        let model = Model::new(
            &["a", "b", "c"],
            &["x", "y"],
            vec![0.2, 0.4, 0.4],
            vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            vec![0.5, 0.5, 0.5, 0.5, 0.5, 0.5],
        )
        .unwrap();
        let best = viterbi(&model, &[0, 1]).unwrap();
        assert_eq!(best.path, vec![1, 1]);
        assert!((best.probability - 0.4 * 0.5 * 0.5).abs() < 1e-12);
    }

    #[test]
    fn equal_products_keep_the_first_predecessor() {
        // 0.3 * 0.8 and 0.4 * 0.6 are the same f64, so a -> a and b -> a tie.
        let model = Model::new(
            &["a", "b", "c"],
            &["x"],
            vec![0.3, 0.4, 0.3],
            vec![0.8, 0.1, 0.1, 0.6, 0.2, 0.2, 0.4, 0.3, 0.3],
            vec![1.0, 1.0, 1.0],
        )
        .unwrap();
        assert_eq!(0.3_f64 * 0.8, 0.4_f64 * 0.6);
        let best = viterbi(&model, &[0, 0]).unwrap();
        assert_eq!(model.state_labels(&best.path), vec!["a", "a"]);
        assert_eq!(best.probability, 0.3 * 0.8);
    }

    #[test]
    fn emission_is_part_of_the_comparison() {
        // Into a at t = 1: 0.125 * 0.21 < 0.375 * 0.07, but both products
        // become the same f64 once multiplied by the emission 0.3.
        let model = Model::new(
            &["a", "b"],
            &["x", "y", "z"],
            vec![0.25, 0.75],
            vec![0.21, 0.79, 0.07, 0.93],
            vec![0.5, 0.3, 0.2, 0.5, 0.01, 0.49],
        )
        .unwrap();
        assert!(0.125_f64 * 0.21 < 0.375 * 0.07);
        assert_eq!(0.125_f64 * 0.21 * 0.3, 0.375 * 0.07 * 0.3);
        let best = viterbi(&model, &[0, 1]).unwrap();
        assert_eq!(model.state_labels(&best.path), vec!["a", "a"]);
        assert_eq!(best.probability, 0.125 * 0.21 * 0.3);
    }

    #[test]
    fn long_sequence_is_rescaled() {
        let model = weather();
        let obs: Vec<usize> = (0..3000).map(|t| (t * 7 + t / 5) % 3).collect();
        let best = viterbi(&model, &obs).unwrap();
        assert!(best.log_probability.is_finite());
        assert!(best.log_probability < -1000.0);
        assert_eq!(best.probability, 0.0);
        assert_eq!(best.path.len(), 3000);

        // The path found on the rescaled lattice scores exactly as reported.
        let mut logp = model.initial(best.path[0]).ln() + model.emission(best.path[0], obs[0]).ln();
        for t in 1..obs.len() {
            logp += model.transition(best.path[t - 1], best.path[t]).ln()
                + model.emission(best.path[t], obs[t]).ln();
        }
        assert!((logp - best.log_probability).abs() < 1e-9 * logp.abs());
    }

    #[test]
    fn all_zero_collapses_to_first_state() {
        // Nobody can emit y.
        let model = Model::new(
            &["a", "b"],
            &["x", "y"],
            vec![0.5, 0.5],
            vec![0.5, 0.5, 0.5, 0.5],
            vec![1.0, 0.0, 1.0, 0.0],
        )
        .unwrap();
        let best = viterbi(&model, &[0, 1, 0]).unwrap();
        assert_eq!(best.probability, 0.0);
        assert_eq!(best.log_probability, f64::NEG_INFINITY);
        assert_eq!(best.path, vec![0, 0, 0]);
    }

    #[test]
    fn single_observation() {
        let model = weather();
        let best = viterbi(&model, &[2]).unwrap();
        assert_eq!(best.path, vec![0]);
        assert!((best.probability - 0.3).abs() < 1e-12);
    }

    #[test]
    fn rejects_unknown_symbol() {
        assert!(matches!(
            viterbi(&weather(), &[0, 5]),
            Err(Error::InvalidInput(..))
        ));
    }
}
