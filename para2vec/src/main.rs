use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use para2vec::config::init_tracing;
use para2vec::{sink, Model, ModelConfig, RandomStream, TrainConfig, Trainer};

#[derive(Parser)]
#[command(about = "PARAGRAPH VECTOR estimation toolkit", long_about = None)]
struct Options {
    #[command(flatten)]
    model: ModelConfig,

    #[command(flatten)]
    train: TrainConfig,

    /// Use FILE to save the resulting word vectors, one word per line
    #[arg(long = "word-output", value_name = "FILE")]
    word_output_file: Option<PathBuf>,

    /// Use FILE to save the resulting paragraph vectors, one document per line
    #[arg(long = "paragraph-output", value_name = "FILE")]
    paragraph_output_file: Option<PathBuf>,

    /// Save all three weight matrices to FILE in binary form
    #[arg(long = "save-model", value_name = "FILE")]
    model_file: Option<PathBuf>,

    /// The vocabulary will be saved to FILE
    #[arg(long = "save-vocab", value_name = "FILE")]
    save_vocab_file: Option<PathBuf>,

    /// Set the debug mode (default = 2 = more info during training)
    #[arg(long = "debug", default_value_t = 2)]
    debug_mode: usize,
}

fn train_model(options: Options) -> Result<()> {
    options.train.validate()?;
    info!(
        "Starting training using file {}",
        options.model.train_file.display()
    );

    let mut rng = RandomStream::new(options.model.seed);
    let model = Model::build(options.model.clone(), &mut rng)?;
    if let Some(f) = &options.save_vocab_file {
        model.vocab().save(f)?;
    }

    let mut trainer = Trainer::new(options.train.num_threads, rng)?
        .with_progress(options.debug_mode > 1);
    for epoch in 0..options.train.iter {
        let (alpha, shrink) = options.train.epoch_schedule(epoch);
        let stats = trainer.train(&model, alpha, shrink, options.train.negative)?;
        info!(
            "Epoch {}/{}  Alpha: {alpha:.6}  Trained: {}  Skipped: {}  Loss: {:.5}",
            epoch + 1,
            options.train.iter,
            stats.trained,
            stats.skipped,
            stats.mean_loss()
        );
    }

    if let Some(f) = &options.word_output_file {
        sink::save_word_vectors(model.vocab(), model.store(), f)?;
    }
    if let Some(f) = &options.paragraph_output_file {
        sink::save_paragraph_vectors(model.store(), f)?;
    }
    if let Some(f) = &options.model_file {
        sink::save_model(model.store(), f)?;
    }
    Ok(())
}

fn main() {
    let options = Options::parse();
    init_tracing(options.debug_mode);

    if let Err(err) = train_model(options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
