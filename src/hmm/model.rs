use std::sync::Arc;

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};

use crate::{
    quark::{Quark, StringTable},
    Error, Result,
};

/// Allowed deviation of a probability row sum from one.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A discrete hidden Markov model.
///
/// The tables are dense and row-major:
///  - `initial` is a [N] vector,
///  - `transition` is a [N][N] matrix whose element [i][j] is P(j at t+1 | i at t),
///  - `emission` is a [N][M] matrix whose element [s][v] is P(v | s).
///
/// A model is never changed after construction. The label tables are shared
/// through `Arc`, so re-estimated models reuse the ones of their parent.
#[derive(Debug, Clone)]
pub struct Model {
    states: Arc<Quark>,
    vocabulary: Arc<Quark>,
    initial: Vec<f64>,
    transition: Vec<f64>,
    emission: Vec<f64>,
}

/// Checks that `row` is a distribution. With `allow_unused`, an all-zero
/// row is accepted too: re-estimation gives one to a state it never saw.
fn check_row(name: &str, row: &[f64], allow_unused: bool) -> Result<()> {
    if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(Error::MalformedModel(format!(
            "{name} contains an invalid probability {p}"
        )));
    }
    let sum: f64 = row.iter().sum();
    if allow_unused && sum == 0.0 {
        return Ok(());
    }
    if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(Error::MalformedModel(format!(
            "{name} sums to {sum}, expected 1"
        )));
    }
    Ok(())
}

fn unique_labels<S: AsRef<str>>(kind: &str, labels: &[S]) -> Result<Quark> {
    if labels.is_empty() {
        return Err(Error::MalformedModel(format!("no {kind} declared")));
    }
    Quark::unique(labels)
        .map_err(|dup| Error::MalformedModel(format!("{kind} '{dup}' declared twice")))
}

/// Draws an index in proportion to `row`; `None` for an all-zero row.
fn draw<R: Rng + ?Sized>(row: &[f64], rng: &mut R) -> Option<usize> {
    WeightedIndex::new(row).ok().map(|dist| dist.sample(rng))
}

impl Model {
    /// Creates a model from label lists and dense row-major tables,
    /// validating dimensions and row sums. A transition or emission row may
    /// also be all zero, the shape re-estimation gives an unused state.
    pub fn new<S: AsRef<str>, V: AsRef<str>>(
        states: &[S],
        vocabulary: &[V],
        initial: Vec<f64>,
        transition: Vec<f64>,
        emission: Vec<f64>,
    ) -> Result<Self> {
        let states = unique_labels("states", states)?;
        let vocabulary = unique_labels("symbols", vocabulary)?;
        let n = states.len();
        let m = vocabulary.len();
        if initial.len() != n {
            return Err(Error::MalformedModel(format!(
                "initial distribution has {} entries for {n} states",
                initial.len()
            )));
        }
        if transition.len() != n * n {
            return Err(Error::MalformedModel(format!(
                "transition matrix has {} entries, expected {}",
                transition.len(),
                n * n
            )));
        }
        if emission.len() != n * m {
            return Err(Error::MalformedModel(format!(
                "emission matrix has {} entries, expected {}",
                emission.len(),
                n * m
            )));
        }

        check_row("initial distribution", &initial, false)?;
        for (i, row) in transition.chunks_exact(n).enumerate() {
            check_row(&format!("transition row '{}'", states.labels()[i]), row, true)?;
        }
        for (i, row) in emission.chunks_exact(m).enumerate() {
            check_row(&format!("emission row '{}'", states.labels()[i]), row, true)?;
        }

        Ok(Self {
            states: Arc::new(states),
            vocabulary: Arc::new(vocabulary),
            initial,
            transition,
            emission,
        })
    }

    /// Draws a random model: every row is a vector of uniform weights in
    /// [0.1, 1) normalized to one.
    pub fn random<S: AsRef<str>, V: AsRef<str>, R: Rng + ?Sized>(
        states: &[S],
        vocabulary: &[V],
        rng: &mut R,
    ) -> Result<Self> {
        let n = states.len();
        let m = vocabulary.len();
        let mut row = |len: usize| -> Vec<f64> {
            let xs: Vec<f64> = (0..len).map(|_| rng.gen_range(0.1..1.0)).collect();
            let sum: f64 = xs.iter().sum();
            xs.into_iter().map(|x| x / sum).collect()
        };
        let initial = row(n);
        let transition = (0..n).flat_map(|_| row(n)).collect();
        let emission = (0..n).flat_map(|_| row(m)).collect();
        Self::new(states, vocabulary, initial, transition, emission)
    }

    /// A model with the same states and vocabulary but new tables.
    /// Rows are not validated: re-estimation may leave the row of an
    /// unvisited state at all zeros.
    pub(crate) fn with_tables(
        &self,
        initial: Vec<f64>,
        transition: Vec<f64>,
        emission: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(initial.len(), self.num_states());
        debug_assert_eq!(transition.len(), self.num_states() * self.num_states());
        debug_assert_eq!(emission.len(), self.num_states() * self.num_symbols());
        Self {
            states: Arc::clone(&self.states),
            vocabulary: Arc::clone(&self.vocabulary),
            initial,
            transition,
            emission,
        }
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn states(&self) -> &Quark {
        &self.states
    }

    pub fn vocabulary(&self) -> &Quark {
        &self.vocabulary
    }

    #[inline]
    pub fn initial(&self, s: usize) -> f64 {
        self.initial[s]
    }

    #[inline]
    pub fn transition(&self, i: usize, j: usize) -> f64 {
        self.transition[self.num_states() * i + j]
    }

    #[inline]
    pub fn emission(&self, s: usize, v: usize) -> f64 {
        self.emission[self.num_symbols() * s + v]
    }

    pub fn initial_probabilities(&self) -> &[f64] {
        &self.initial
    }

    pub fn transition_row(&self, i: usize) -> &[f64] {
        let n = self.num_states();
        &self.transition[n * i..n * (i + 1)]
    }

    pub fn emission_row(&self, s: usize) -> &[f64] {
        let m = self.num_symbols();
        &self.emission[m * s..m * (s + 1)]
    }

    pub fn state_id(&self, label: &str) -> Option<usize> {
        self.states.to_id(label)
    }

    pub fn symbol_id(&self, label: &str) -> Option<usize> {
        self.vocabulary.to_id(label)
    }

    pub fn state_label(&self, id: usize) -> Option<&str> {
        self.states.to_str(id)
    }

    /// Maps symbol labels to the ids the inference passes work on.
    pub fn observations<S: AsRef<str>>(&self, symbols: &[S]) -> Result<Vec<usize>> {
        symbols
            .iter()
            .enumerate()
            .map(|(t, s)| {
                let s = s.as_ref();
                self.symbol_id(s).ok_or_else(|| {
                    Error::InvalidInput(format!("unknown symbol '{s}' at position {t}"))
                })
            })
            .collect()
    }

    /// Maps a state path back to labels.
    pub fn state_labels(&self, path: &[usize]) -> Vec<&str> {
        path.iter()
            .map(|&s| self.state_label(s).unwrap_or("N/A"))
            .collect()
    }

    /// Rejects empty sequences and out-of-range symbol ids.
    pub(crate) fn check_observations(&self, observations: &[usize]) -> Result<()> {
        if observations.is_empty() {
            return Err(Error::InvalidInput("observation sequence is empty".into()));
        }
        let m = self.num_symbols();
        if let Some((t, o)) = observations.iter().enumerate().find(|(_, o)| **o >= m) {
            return Err(Error::InvalidInput(format!(
                "symbol id {o} at position {t} is outside the vocabulary of {m} symbols"
            )));
        }
        Ok(())
    }

    /// Runs the generative process for `len` steps and returns the hidden
    /// state path together with the emitted symbol ids.
    ///
    /// Fails with `InvalidInput` when the walk reaches a state whose
    /// transition or emission row is all zero.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        len: usize,
        rng: &mut R,
    ) -> Result<(Vec<usize>, Vec<usize>)> {
        if len == 0 {
            return Err(Error::InvalidInput("sample length must be positive".into()));
        }
        let label = |s: usize| self.state_label(s).unwrap_or("N/A");
        let mut states = Vec::with_capacity(len);
        let mut symbols = Vec::with_capacity(len);
        let mut s = draw(&self.initial, rng)
            .ok_or_else(|| Error::InvalidInput("initial distribution is all zero".into()))?;
        for t in 0..len {
            if t > 0 {
                s = draw(self.transition_row(s), rng).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "state '{}' has no outgoing transitions",
                        label(s)
                    ))
                })?;
            }
            states.push(s);
            let symbol = draw(self.emission_row(s), rng).ok_or_else(|| {
                Error::InvalidInput(format!("state '{}' emits no symbol", label(s)))
            })?;
            symbols.push(symbol);
        }
        Ok((states, symbols))
    }
}
