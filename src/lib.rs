//! Discrete hidden Markov models: sequence likelihood (Forward, Backward),
//! most likely state paths (Viterbi) and Baum-Welch re-estimation.
pub mod dataset;
mod error;
pub mod evaluation;
pub mod hmm;
pub mod quantize;
pub mod quark;
pub mod record;
pub mod trainer;

pub use crate::dataset::{Dataset, Sequence};
pub use crate::error::{Error, Result};
pub use crate::evaluation::{Estimation, Evaluation};
pub use crate::hmm::{
    backward, forward, posteriors, reestimate, reestimate_with, viterbi, BackwardPass,
    ForwardPass, Lattice, Model, Params, Posteriors, ViterbiPath,
};
pub use crate::quantize::Bitmap;
pub use crate::record::ModelRecord;
pub use crate::trainer::{Trainer, Training, TrainingOptions};
