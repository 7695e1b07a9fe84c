use super::{forward::checked, lattice::Lattice, model::Model};
use crate::Result;

/// Result of the Backward algorithm.
#[derive(Debug, Clone)]
pub struct BackwardPass {
    pub probability: f64,
    pub log_probability: f64,
    /// β[s][t] = P(o_t+1..o_T-1 | state s at t).
    pub beta: Lattice,
}

impl BackwardPass {
    pub fn checked_probability(&self) -> Result<f64> {
        checked(self.probability, self.log_probability)
    }
}

/// Computes the probability of `observations` by right-to-left dynamic
/// programming and returns the β lattice with it.
///
/// ```text
/// β[s][T-1] = 1
/// β[i][t]   = Σ_j transition[i][j] * emission[j][o_t+1] * β[j][t+1]
/// P         = Σ_s initial[s] * emission[s][o_0] * β[s][0]
/// ```
pub fn backward(model: &Model, observations: &[usize]) -> Result<BackwardPass> {
    model.check_observations(observations)?;
    let n = model.num_states();
    let t_len = observations.len();
    let mut beta = Lattice::new(n, t_len);

    /* Compute the beta scores at (T-1, *). */
    beta.column_mut(t_len - 1).iter_mut().for_each(|b| *b = 1.0);
    beta.set_log_scale(t_len - 1, 0.0);
    let mut log_scale = 0.0;

    /* Compute the beta scores at (t, *). */
    for t in (0..t_len - 1).rev() {
        let next_obs = observations[t + 1];
        let (cur, next) = beta.adjacent_mut(t);
        for (i, b) in cur.iter_mut().enumerate() {
            let mut sum = 0.0;
            for (j, &nb) in next.iter().enumerate() {
                sum += model.transition(i, j) * model.emission(j, next_obs) * nb;
            }
            *b = sum;
        }
        log_scale = beta.normalize(t, log_scale);
    }

    let o0 = observations[0];
    let total: f64 = beta
        .column(0)
        .iter()
        .enumerate()
        .map(|(s, &b)| model.initial(s) * model.emission(s, o0) * b)
        .sum();
    let log_probability = if total > 0.0 {
        beta.log_scale(0) + total.ln()
    } else {
        f64::NEG_INFINITY
    };
    log::debug!("backward: T = {t_len}, log P = {log_probability}");
    Ok(BackwardPass {
        probability: log_probability.exp(),
        log_probability,
        beta,
    })
}
