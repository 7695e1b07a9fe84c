//! Inference and re-estimation for discrete hidden Markov models.
//!
//! All operations are pure functions of a [`Model`] and a sequence of
//! symbol ids; none of them mutates the model, so one model can be shared
//! between threads.
pub mod backward;
pub mod forward;
pub mod lattice;
pub mod model;
pub mod reestimate;
pub mod viterbi;

pub use backward::{backward, BackwardPass};
pub use forward::{forward, ForwardPass};
pub use lattice::Lattice;
pub use model::{Model, ROW_SUM_TOLERANCE};
pub use reestimate::{posteriors, reestimate, reestimate_with, Params, Posteriors, AGREEMENT_TOLERANCE};
pub use viterbi::{viterbi, ViterbiPath};
