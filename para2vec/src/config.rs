//! Run configuration shared by the command-line tools.

use std::path::PathBuf;

use anyhow::{ensure, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::real;
use crate::store::Shape;

pub const DEFAULT_MIN_COUNT: u64 = 5;
pub const DEFAULT_WORD_DIM: usize = 50;
pub const DEFAULT_PARAGRAPH_DIM: usize = 50;
pub const DEFAULT_CONTEXT_LEN: usize = 5;
pub const DEFAULT_SAMPLE: real = 1e-5;
pub const DEFAULT_SEED: u64 = 1;

pub const DEFAULT_ALPHA: real = 0.025;
pub const DEFAULT_NEGATIVE: usize = 5;
pub const DEFAULT_THREADS: usize = 12;
pub const DEFAULT_ITER: usize = 5;

/// Everything that determines the vocabulary and the shape of the model.
///
/// A saved model can only be loaded with the same settings it was trained with.
#[derive(Args, Debug, Clone)]
pub struct ModelConfig {
    /// Use text data from FILE to train the model, one document per line
    #[arg(long = "train", value_name = "FILE")]
    pub train_file: PathBuf,

    /// Discard words that appear less than N times
    #[arg(long = "min-count", value_name = "N", default_value_t = DEFAULT_MIN_COUNT)]
    pub min_count: u64,

    /// Set size of word vectors
    #[arg(long = "word-size", value_name = "N", default_value_t = DEFAULT_WORD_DIM)]
    pub word_dim: usize,

    /// Set size of paragraph vectors
    #[arg(long = "paragraph-size", value_name = "N", default_value_t = DEFAULT_PARAGRAPH_DIM)]
    pub paragraph_dim: usize,

    /// Number of preceding words used to predict each word
    #[arg(long = "context", value_name = "N", default_value_t = DEFAULT_CONTEXT_LEN)]
    pub context_len: usize,

    /// Set threshold for occurrence of words. Those that appear with higher
    /// frequency in the training data will be randomly down-sampled; 0
    /// disables down-sampling
    #[arg(long, default_value_t = DEFAULT_SAMPLE)]
    pub sample: real,

    /// Seed for random initialization and sampling
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

impl ModelConfig {
    pub fn new(train_file: impl Into<PathBuf>) -> Self {
        ModelConfig {
            train_file: train_file.into(),
            min_count: DEFAULT_MIN_COUNT,
            word_dim: DEFAULT_WORD_DIM,
            paragraph_dim: DEFAULT_PARAGRAPH_DIM,
            context_len: DEFAULT_CONTEXT_LEN,
            sample: DEFAULT_SAMPLE,
            seed: DEFAULT_SEED,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.word_dim > 0, "--word-size must be at least 1");
        ensure!(self.paragraph_dim > 0, "--paragraph-size must be at least 1");
        ensure!(
            self.sample >= 0.0 && self.sample.is_finite(),
            "--sample must be a non-negative number"
        );
        Ok(())
    }

    pub fn shape(&self) -> Shape {
        Shape {
            word_dim: self.word_dim,
            paragraph_dim: self.paragraph_dim,
            context_len: self.context_len,
        }
    }
}

/// The training schedule.
#[derive(Args, Debug, Clone)]
pub struct TrainConfig {
    /// Set the starting learning rate
    #[arg(long, default_value_t = DEFAULT_ALPHA)]
    pub alpha: real,

    /// Number of negative examples; common values are 3 - 10 (0 = not used)
    #[arg(long, default_value_t = DEFAULT_NEGATIVE)]
    pub negative: usize,

    /// Use N threads
    #[arg(long = "threads", value_name = "N", default_value_t = DEFAULT_THREADS)]
    pub num_threads: usize,

    /// Number of passes over the corpus
    #[arg(long, default_value_t = DEFAULT_ITER)]
    pub iter: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            alpha: DEFAULT_ALPHA,
            negative: DEFAULT_NEGATIVE,
            num_threads: DEFAULT_THREADS,
            iter: DEFAULT_ITER,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_threads > 0, "--threads must be at least 1");
        ensure!(
            self.alpha > 0.0 && self.alpha.is_finite(),
            "--alpha must be a positive number"
        );
        Ok(())
    }

    /// Starting learning rate and total shrink for `epoch` (counting from 0).
    ///
    /// Each epoch starts where the previous one left off, so the rate decays
    /// linearly from `alpha` to zero over the whole run.
    pub fn epoch_schedule(&self, epoch: usize) -> (real, real) {
        let num_epochs = self.iter as real;
        let starting_alpha = self.alpha * ((self.iter - epoch) as real / num_epochs);
        (starting_alpha, self.alpha / num_epochs)
    }
}

/// Install the global `tracing` subscriber.
///
/// `debug_mode` picks the default level (0 = warnings only, 1 and 2 = info,
/// 3 or more = debug); `RUST_LOG` overrides it.
pub fn init_tracing(debug_mode: usize) {
    let level = match debug_mode {
        0 => "warn",
        1 | 2 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
