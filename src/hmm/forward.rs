use super::{lattice::Lattice, model::Model};
use crate::{Error, Result};

/// Result of the Forward algorithm.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// P(observations | model). Underflows to 0 on long sequences; use
    /// `log_probability` or `checked_probability` there.
    pub probability: f64,
    /// ln P(observations | model), −∞ for an impossible sequence.
    pub log_probability: f64,
    /// α[s][t] = P(o_0..o_t, state s at t).
    pub alpha: Lattice,
}

impl ForwardPass {
    /// The probability, or `NumericInstability` if it is too small to be
    /// represented although the sequence is possible.
    pub fn checked_probability(&self) -> Result<f64> {
        checked(self.probability, self.log_probability)
    }
}

pub(crate) fn checked(probability: f64, log_probability: f64) -> Result<f64> {
    if probability == 0.0 && log_probability.is_finite() {
        return Err(Error::NumericInstability(format!(
            "probability underflows (log probability {log_probability})"
        )));
    }
    Ok(probability)
}

/// Computes the probability of `observations` by left-to-right dynamic
/// programming and returns the α lattice with it.
///
/// ```text
/// α[s][0] = initial[s] * emission[s][o_0]
/// α[s][t] = (Σ_i α[i][t-1] * transition[i][s]) * emission[s][o_t]
/// P       = Σ_s α[s][T-1]
/// ```
pub fn forward(model: &Model, observations: &[usize]) -> Result<ForwardPass> {
    model.check_observations(observations)?;
    let n = model.num_states();
    let t_len = observations.len();
    let mut alpha = Lattice::new(n, t_len);

    /* Compute the alpha scores on nodes (0, *). */
    let o0 = observations[0];
    for (s, a) in alpha.column_mut(0).iter_mut().enumerate() {
        *a = model.initial(s) * model.emission(s, o0);
    }
    let mut log_scale = alpha.normalize(0, 0.0);

    /* Compute the alpha scores on nodes (t, *). */
    for t in 1..t_len {
        let ot = observations[t];
        let (prev, cur) = alpha.adjacent_mut(t - 1);
        for (s, a) in cur.iter_mut().enumerate() {
            let mut sum = 0.0;
            for (i, &p) in prev.iter().enumerate() {
                sum += p * model.transition(i, s);
            }
            *a = sum * model.emission(s, ot);
        }
        log_scale = alpha.normalize(t, log_scale);
    }

    // The last column is normalized, so its true sum is exp(log_scale).
    let log_probability = log_scale;
    log::debug!("forward: T = {t_len}, log P = {log_probability}");
    Ok(ForwardPass {
        probability: log_probability.exp(),
        log_probability,
        alpha,
    })
}
