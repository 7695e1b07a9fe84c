use std::{fmt, str::FromStr};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::{backward::backward, forward::forward, model::Model};
use crate::{Error, Result};

/// Maximum relative disagreement between the Forward and Backward
/// probabilities, compared in log space.
pub const AGREEMENT_TOLERANCE: f64 = 1e-9;

bitflags! {
    /// Parameter groups updated by one re-estimation step.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Params: u8 {
        const INITIAL = 0x01;
        const TRANSITION = 0x02;
        const EMISSION = 0x04;
    }
}

impl Default for Params {
    fn default() -> Self {
        Params::all()
    }
}

impl FromStr for Params {
    type Err = Error;

    /// Parses letters `i` (initial), `t` (transition) and `e` (emission).
    fn from_str(s: &str) -> Result<Self> {
        s.chars().try_fold(Params::empty(), |acc, c| match c {
            'i' => Ok(acc | Params::INITIAL),
            't' => Ok(acc | Params::TRANSITION),
            'e' => Ok(acc | Params::EMISSION),
            _ => Err(Error::InvalidParameter(format!(
                "unknown parameter group '{c}' in '{s}' (expected i, t or e)"
            ))),
        })
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, c) in [
            (Params::INITIAL, 'i'),
            (Params::TRANSITION, 't'),
            (Params::EMISSION, 'e'),
        ] {
            if self.contains(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

/// Posterior state and transition probabilities of one observation
/// sequence (the E-step of Baum-Welch).
#[derive(Debug, Clone)]
pub struct Posteriors {
    num_states: usize,
    num_items: usize,
    pub log_probability: f64,
    /**
     * State occupancy.
     *  This is a [T][N] matrix whose element [t][s] presents
     *  P(state s at t | observations).
     */
    gamma: Vec<f64>,
    /**
     * Transition occupancy.
     *  This is a [T-1][N][N] tensor whose element [t][i][j] presents
     *  P(state i at t, state j at t+1 | observations).
     */
    xi: Vec<f64>,
}

impl Posteriors {
    pub fn len(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// γ[s][t].
    pub fn occupancy(&self, s: usize, t: usize) -> f64 {
        self.gamma[self.num_states * t + s]
    }

    /// ξ[i][j][t] for t < T - 1.
    pub fn transition(&self, i: usize, j: usize, t: usize) -> f64 {
        let n = self.num_states;
        self.xi[n * n * t + n * i + j]
    }

    /// Σ_t ξ[i][j][t].
    pub fn expected_transitions(&self, i: usize, j: usize) -> f64 {
        (0..self.num_items.saturating_sub(1))
            .map(|t| self.transition(i, j, t))
            .sum()
    }
}

/// Runs Forward and Backward once and combines the lattices into the
/// posterior occupancies γ and ξ.
///
/// ```text
/// γ[s][t]    = α[s][t] * β[s][t] / P
/// ξ[i][j][t] = α[i][t] * transition[i][j] * emission[j][o_t+1] * β[j][t+1] / P
/// ```
/// Both are computed from the rescaled lattices and normalized per time
/// step, which is the same quantity without ever forming α·β in linear
/// space.
pub fn posteriors(model: &Model, observations: &[usize]) -> Result<Posteriors> {
    let fwd = forward(model, observations)?;
    let bwd = backward(model, observations)?;
    if fwd.log_probability == f64::NEG_INFINITY || bwd.log_probability == f64::NEG_INFINITY {
        return Err(Error::DegenerateSequence);
    }
    let diff = (fwd.log_probability - bwd.log_probability).abs();
    if diff > AGREEMENT_TOLERANCE * fwd.log_probability.abs().max(1.0) {
        return Err(Error::NumericInstability(format!(
            "forward and backward disagree: log P = {} vs {}",
            fwd.log_probability, bwd.log_probability
        )));
    }

    let n = model.num_states();
    let t_len = observations.len();
    let (alpha, beta) = (&fwd.alpha, &bwd.beta);

    let mut gamma = vec![0.0; t_len * n];
    for t in 0..t_len {
        let row = &mut gamma[n * t..n * (t + 1)];
        for (s, g) in row.iter_mut().enumerate() {
            *g = alpha.scaled(s, t) * beta.scaled(s, t);
        }
        normalize(row, t)?;
    }

    let mut xi = vec![0.0; t_len.saturating_sub(1) * n * n];
    for t in 0..t_len.saturating_sub(1) {
        let next_obs = observations[t + 1];
        let block = &mut xi[n * n * t..n * n * (t + 1)];
        /* row[j] = emission[j][o_t+1] * beta'[j][t+1] */
        let row: Vec<f64> = (0..n)
            .map(|j| model.emission(j, next_obs) * beta.scaled(j, t + 1))
            .collect();
        for i in 0..n {
            let a = alpha.scaled(i, t);
            for j in 0..n {
                block[n * i + j] = a * model.transition(i, j) * row[j];
            }
        }
        normalize(block, t)?;
    }

    Ok(Posteriors {
        num_states: n,
        num_items: t_len,
        log_probability: fwd.log_probability,
        gamma,
        xi,
    })
}

fn normalize(xs: &mut [f64], t: usize) -> Result<()> {
    let sum: f64 = xs.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return Err(Error::NumericInstability(format!(
            "posterior mass at t = {t} is {sum}"
        )));
    }
    xs.iter_mut().for_each(|x| *x /= sum);
    Ok(())
}

/// One Baum-Welch iteration over every parameter group.
pub fn reestimate(model: &Model, observations: &[usize]) -> Result<Model> {
    reestimate_with(model, observations, Params::all())
}

/// One Baum-Welch iteration updating the groups in `params`; the other
/// tables are copied from `model`. The input model is left untouched.
///
/// A state that is never occupied before the last step gets an all-zero
/// transition row, and one never occupied at all an all-zero emission row.
pub fn reestimate_with(model: &Model, observations: &[usize], params: Params) -> Result<Model> {
    let post = posteriors(model, observations)?;
    let n = model.num_states();
    let m = model.num_symbols();
    let t_len = observations.len();

    let initial = if params.contains(Params::INITIAL) {
        (0..n).map(|s| post.occupancy(s, 0)).collect()
    } else {
        model.initial_probabilities().to_vec()
    };

    let transition = if params.contains(Params::TRANSITION) {
        let mut transition = vec![0.0; n * n];
        for i in 0..n {
            let occupied: f64 = (0..t_len - 1).map(|t| post.occupancy(i, t)).sum();
            if occupied > 0.0 {
                for j in 0..n {
                    transition[n * i + j] = post.expected_transitions(i, j) / occupied;
                }
            }
        }
        transition
    } else {
        (0..n).flat_map(|i| model.transition_row(i).to_vec()).collect()
    };

    let emission = if params.contains(Params::EMISSION) {
        let mut emission = vec![0.0; n * m];
        for s in 0..n {
            let occupied: f64 = (0..t_len).map(|t| post.occupancy(s, t)).sum();
            if occupied > 0.0 {
                for (t, &o) in observations.iter().enumerate() {
                    emission[m * s + o] += post.occupancy(s, t);
                }
                emission[m * s..m * (s + 1)]
                    .iter_mut()
                    .for_each(|e| *e /= occupied);
            }
        }
        emission
    } else {
        (0..n).flat_map(|s| model.emission_row(s).to_vec()).collect()
    };

    Ok(model.with_tables(initial, transition, emission))
}
