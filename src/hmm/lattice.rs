/// A dense [state][time] table of forward (α) or backward (β) probabilities.
///
/// Values are kept rescaled: every column is divided by its sum, and
/// `log_scale[t]` records the logarithm of the factor that turns the stored
/// column back into the true probabilities.
///
/// For an α lattice `log_scale[t]` accumulates the column sums of 0..=t, for
/// a β lattice those of t..T. A column whose true values are all zero is
/// stored as zeros with a log scale of −∞.
#[derive(Debug, Clone)]
pub struct Lattice {
    num_states: usize,
    num_items: usize,
    /**
     * Scaled scores.
     *  This is a [T][N] matrix whose element [t][s] presents the normalized
     *  probability of state #s at #t.
     */
    score: Vec<f64>,
    /**
     * Scale vector.
     *  This is a [T] vector whose element [t] presents the logarithm of the
     *  factor for the column #t.
     */
    log_scale: Vec<f64>,
}

impl Lattice {
    pub(crate) fn new(num_states: usize, num_items: usize) -> Self {
        Self {
            num_states,
            num_items,
            score: vec![0.0; num_states * num_items],
            log_scale: vec![0.0; num_items],
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    /// The number of time steps (T).
    pub fn len(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// The true (unscaled) value at (state, time).
    pub fn get(&self, state: usize, t: usize) -> f64 {
        let scaled = self.scaled(state, t);
        if scaled == 0.0 {
            0.0
        } else {
            (scaled.ln() + self.log_scale[t]).exp()
        }
    }

    /// The logarithm of the true value at (state, time); −∞ for zero.
    pub fn log_value(&self, state: usize, t: usize) -> f64 {
        self.scaled(state, t).ln() + self.log_scale[t]
    }

    /// The normalized value at (state, time).
    #[inline]
    pub fn scaled(&self, state: usize, t: usize) -> f64 {
        self.score[self.num_states * t + state]
    }

    /// The normalized column at time `t`.
    #[inline]
    pub fn column(&self, t: usize) -> &[f64] {
        &self.score[self.num_states * t..self.num_states * (t + 1)]
    }

    pub fn log_scale(&self, t: usize) -> f64 {
        self.log_scale[t]
    }

    pub(crate) fn column_mut(&mut self, t: usize) -> &mut [f64] {
        &mut self.score[self.num_states * t..self.num_states * (t + 1)]
    }

    /// Columns #t and #(t + 1), borrowed together.
    pub(crate) fn adjacent_mut(&mut self, t: usize) -> (&mut [f64], &mut [f64]) {
        let n = self.num_states;
        let (head, tail) = self.score[n * t..n * (t + 2)].split_at_mut(n);
        (head, tail)
    }

    /// Divides column #t by its sum and sets its log scale to
    /// `carried + ln(sum)`. Returns the new log scale.
    pub(crate) fn normalize(&mut self, t: usize, carried: f64) -> f64 {
        let column = self.column_mut(t);
        let sum: f64 = column.iter().sum();
        let log_scale = if sum > 0.0 {
            let inv = 1.0 / sum;
            column.iter_mut().for_each(|x| *x *= inv);
            carried + sum.ln()
        } else {
            column.iter_mut().for_each(|x| *x = 0.0);
            f64::NEG_INFINITY
        };
        self.log_scale[t] = log_scale;
        log_scale
    }

    /// Stores a column as is, with the given log scale.
    pub(crate) fn set_log_scale(&mut self, t: usize, log_scale: f64) {
        self.log_scale[t] = log_scale;
    }
}
