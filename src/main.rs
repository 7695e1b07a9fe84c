use std::{fs, path::PathBuf, process::ExitCode, time::Instant};

use clap::{Parser, Subcommand};
use hmmsuite::{
    backward, forward,
    quantize::{self, Bitmap, DEFAULT_THRESHOLD},
    viterbi, Dataset, Evaluation, Model, Result, Trainer, TrainingOptions,
};

/// Inference and training for discrete hidden Markov models.
#[derive(Debug, Parser)]
#[command(version)]
#[command(propagate_version = true)]
struct Argv {
    /// increase the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// print the probability of each sequence computed by the Forward algorithm
    Forward(Score),
    /// print the probability of each sequence computed by the Backward algorithm
    Backward(Score),
    /// print the most likely state path of each sequence
    Viterbi(Score),
    /// re-estimate a model on the first sequence of a data set
    Train {
        /// read the initial model from a file (MODEL)
        #[arg(short, long, value_name = "MODEL")]
        model: PathBuf,
        /// write the trained model to a file (OUTPUT)
        #[arg(short, long, value_name = "OUTPUT")]
        output: PathBuf,
        /// set a training parameter (name=value)
        #[arg(short = 'p', value_name = "NAME=VALUE")]
        parameters: Vec<String>,
        #[arg(value_name = "FILE")]
        dataset: PathBuf,
    },
    /// assign the most likely states to the items of labeled or unlabeled data
    Tag {
        /// read a model from a file (MODEL)
        #[arg(short, long, value_name = "MODEL")]
        model: PathBuf,
        /// report the performance of the model on the data
        #[arg(short = 't', long = "test")]
        evaluate: bool,
        /// suppress tagging results (useful for test mode)
        #[arg(short, long)]
        quiet: bool,
        #[arg(value_name = "FILE", required = true)]
        datasets: Vec<PathBuf>,
    },
    /// print the observation symbols of glyph bitmaps ('#' ink, '.' blank)
    Quantize {
        #[arg(long, default_value_t = 14)]
        band_height: usize,
        #[arg(long, default_value_t = 14)]
        segment_width: usize,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: usize,
        /// keep the glyph where it is instead of moving it to the top-left corner
        #[arg(long)]
        no_crop: bool,
        #[arg(value_name = "FILE", required = true)]
        bitmaps: Vec<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
struct Score {
    /// read a model from a file (MODEL)
    #[arg(short, long, value_name = "MODEL")]
    model: PathBuf,
    #[arg(value_name = "FILE", required = true)]
    datasets: Vec<PathBuf>,
}

fn score(argv: &Score, f: impl Fn(&Model, &[usize]) -> Result<String>) -> Result<()> {
    let model = Model::from_file(&argv.model)?;
    for fpath in &argv.datasets {
        let ds = Dataset::from_path(fpath)?;
        for seq in ds.iter() {
            let obs = seq.observations(&model)?;
            println!("{}\t{}", seq.symbols.join(" "), f(&model, &obs)?);
        }
    }
    Ok(())
}

fn run(argv: Argv) -> Result<()> {
    match argv.command {
        Command::Forward(argv) => score(&argv, |model, obs| {
            let fwd = forward(model, obs)?;
            Ok(format!("{:e}\t{:.6}", fwd.probability, fwd.log_probability))
        }),
        Command::Backward(argv) => score(&argv, |model, obs| {
            let bwd = backward(model, obs)?;
            Ok(format!("{:e}\t{:.6}", bwd.probability, bwd.log_probability))
        }),
        Command::Viterbi(argv) => score(&argv, |model, obs| {
            let best = viterbi(model, obs)?;
            Ok(format!(
                "{:e}\t{}",
                best.probability,
                model.state_labels(&best.path).join(" ")
            ))
        }),
        Command::Train {
            model,
            output,
            parameters,
            dataset,
        } => {
            let mut options = TrainingOptions::default();
            for s in &parameters {
                options.set_pair(s)?;
            }
            let model = Model::from_file(&model)?;
            let ds = Dataset::from_path(&dataset)?;
            let Some(seq) = ds.iter().next() else {
                log::warn!("no sequence in {}", dataset.display());
                return Ok(());
            };
            let obs = seq.observations(&model)?;
            let training = Trainer::new(options).train(&model, &obs)?;
            println!(
                "iterations: {}, converged: {}, log-likelihood: {:.6} -> {:.6}",
                training.iterations,
                training.converged,
                training.log_likelihoods[0],
                training.log_likelihoods[training.log_likelihoods.len() - 1]
            );
            training.model.to_file(&output)
        }
        Command::Tag {
            model,
            evaluate,
            quiet,
            datasets,
        } => {
            let begin = Instant::now();
            let model = Model::from_file(&model)?;
            let mut evaluation = Evaluation::new(model.num_states());
            for fpath in &datasets {
                let ds = Dataset::from_path(fpath)?;
                for seq in ds.iter() {
                    let obs = seq.observations(&model)?;
                    let prediction = model.state_labels(&viterbi(&model, &obs)?.path);
                    if evaluate {
                        if seq.is_labeled() {
                            evaluation.accumulate(seq.states.as_slice(), prediction.as_slice());
                        } else {
                            log::warn!("skipping unlabeled sequence in evaluation");
                        }
                    }
                    if !quiet {
                        for (symbol, state) in seq.symbols.iter().zip(&prediction) {
                            println!("{state}\t{symbol}");
                        }
                        println!();
                    }
                }
            }
            if evaluate {
                evaluation.evaluate();
                print!("{evaluation}");
                println!("Elapsed time: {:?}", begin.elapsed());
            }
            Ok(())
        }
        Command::Quantize {
            band_height,
            segment_width,
            threshold,
            no_crop,
            bitmaps,
        } => {
            for fpath in &bitmaps {
                let mut bitmap: Bitmap = fs::read_to_string(fpath)?.parse()?;
                if !no_crop {
                    bitmap = bitmap.crop();
                }
                let symbols =
                    quantize::observations(&bitmap, band_height, segment_width, threshold)?;
                let symbols: Vec<String> = symbols.iter().map(ToString::to_string).collect();
                println!("{}\t{}", fpath.display(), symbols.join(" "));
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let argv = Argv::parse();
    let level = match argv.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    log::debug!("{:?}", argv);

    match run(argv) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
