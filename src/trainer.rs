use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
    hmm::{forward, reestimate_with, Model, Params},
    Error, Result,
};

/// Parameters of the Baum-Welch training loop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingOptions {
    /// Upper bound on the number of re-estimation steps.
    pub max_iterations: usize,
    /// Training stops once the log-likelihood moves by less than this.
    pub epsilon: f64,
    /// Parameter groups to update.
    pub params: Params,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-6,
            params: Params::all(),
        }
    }
}

fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidParameter(format!("invalid value for {name}: '{value}'")))
}

impl TrainingOptions {
    /// Sets an option from its textual `name=value` form.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        match name.trim() {
            "max_iterations" => self.max_iterations = parse(name, value)?,
            "epsilon" => {
                let epsilon: f64 = parse(name, value)?;
                if !(epsilon >= 0.0) {
                    return Err(Error::InvalidParameter(format!(
                        "epsilon must be non-negative, got {value}"
                    )));
                }
                self.epsilon = epsilon;
            }
            "params" => self.params = value.trim().parse()?,
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "unknown parameter: {name}"
                )))
            }
        }
        Ok(())
    }

    /// Parses a `name=value` pair.
    pub fn set_pair(&mut self, pair: &str) -> Result<()> {
        let (name, value) = pair.split_once('=').ok_or_else(|| {
            Error::InvalidParameter(format!("expected name=value, got '{pair}'"))
        })?;
        self.set(name, value)
    }
}

/// Outcome of [`Trainer::train`].
#[derive(Debug, Clone)]
pub struct Training {
    pub model: Model,
    /// Log-likelihood of the observations before each step; the last entry
    /// belongs to the final model.
    pub log_likelihoods: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Default)]
pub struct Trainer {
    pub options: TrainingOptions,
}

impl Trainer {
    pub fn new(options: TrainingOptions) -> Self {
        Self { options }
    }

    /// Re-estimates `model` on `observations` until the log-likelihood
    /// settles or `max_iterations` is reached.
    pub fn train(&self, model: &Model, observations: &[usize]) -> Result<Training> {
        let begin = Instant::now();
        let opt = &self.options;
        log::info!(
            "Baum-Welch (max_iterations: {}, epsilon: {}, params: {})",
            opt.max_iterations,
            opt.epsilon,
            opt.params
        );

        let mut current = model.clone();
        let mut prev = forward(&current, observations)?.log_probability;
        if prev == f64::NEG_INFINITY {
            return Err(Error::DegenerateSequence);
        }
        let mut log_likelihoods = vec![prev];
        let mut converged = false;
        let mut iterations = 0;

        while iterations < opt.max_iterations {
            let ts = Instant::now();
            let next = reestimate_with(&current, observations, opt.params)?;
            let logl = forward(&next, observations)?.log_probability;
            iterations += 1;
            log_likelihoods.push(logl);
            current = next;

            let improvement = logl - prev;
            log::info!(
                "iteration {iterations}: log-likelihood {logl:.6}, improvement {improvement:.3e}, took {:?}",
                ts.elapsed()
            );
            if improvement < -opt.epsilon {
                log::warn!(
                    "log-likelihood decreased from {prev} to {logl} at iteration {iterations}"
                );
            }
            prev = logl;
            if improvement.abs() < opt.epsilon {
                converged = true;
                break;
            }
        }

        log::info!(
            "{} after {iterations} iterations, log-likelihood {prev:.6}, took {:?}",
            if converged { "converged" } else { "stopped" },
            begin.elapsed()
        );
        Ok(Training {
            model: current,
            log_likelihoods,
            iterations,
            converged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_options() {
        let mut opt = TrainingOptions::default();
        opt.set("max_iterations", "5").unwrap();
        opt.set("epsilon", "0.01").unwrap();
        opt.set_pair("params=te").unwrap();
        assert_eq!(opt.max_iterations, 5);
        assert_eq!(opt.epsilon, 0.01);
        assert_eq!(opt.params, Params::TRANSITION | Params::EMISSION);

        assert!(matches!(opt.set("c2", "1"), Err(Error::InvalidParameter(..))));
        assert!(matches!(opt.set("epsilon", "-1"), Err(Error::InvalidParameter(..))));
        assert!(matches!(opt.set("max_iterations", "x"), Err(Error::InvalidParameter(..))));
        assert!(matches!(opt.set_pair("epsilon"), Err(Error::InvalidParameter(..))));
    }

    #[test]
    fn options_json() {
        let opt: TrainingOptions = serde_json::from_str(r#"{"max_iterations": 3}"#).unwrap();
        assert_eq!(opt.max_iterations, 3);
        assert_eq!(opt.epsilon, 1e-6);
        assert_eq!(opt.params, Params::all());
    }

    #[test]
    fn stops_at_max_iterations() {
        let model = Model::new(
            &["rainy", "sunny"],
            &["walk", "shop", "clean"],
            vec![0.6, 0.4],
            vec![0.7, 0.3, 0.4, 0.6],
            vec![0.1, 0.4, 0.5, 0.6, 0.3, 0.1],
        )
        .unwrap();
        let trainer = Trainer::new(TrainingOptions {
            max_iterations: 2,
            epsilon: 0.0,
            ..Default::default()
        });
        let training = trainer.train(&model, &[0, 1, 2, 2, 0, 1]).unwrap();
        assert_eq!(training.iterations, 2);
        assert_eq!(training.log_likelihoods.len(), 3);
        assert!(!training.converged);
    }

    #[test]
    fn fixed_point_converges_at_once() {
        let model = Model::new(&["s"], &["x"], vec![1.0], vec![1.0], vec![1.0]).unwrap();
        let training = Trainer::default().train(&model, &[0, 0, 0]).unwrap();
        assert!(training.converged);
        assert_eq!(training.iterations, 1);
        assert_eq!(training.log_likelihoods, vec![0.0, 0.0]);
    }

    #[test]
    fn impossible_sequence() {
        let model = Model::new(&["s"], &["x", "y"], vec![1.0], vec![1.0], vec![1.0, 0.0]).unwrap();
        assert!(matches!(
            Trainer::default().train(&model, &[1]),
            Err(Error::DegenerateSequence)
        ));
    }
}
