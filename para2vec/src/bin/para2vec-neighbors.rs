use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::Parser;

use para2vec::config::init_tracing;
use para2vec::{neighbors, sink, Model, ModelConfig, RandomStream};

#[derive(Parser)]
#[command(about = "Interactively list the nearest neighbors of words", long_about = None)]
struct Options {
    // Must match the settings the model was trained with.
    #[command(flatten)]
    model: ModelConfig,

    /// Model saved by `para2vec --save-model`
    #[arg(long = "model", value_name = "FILE")]
    model_file: PathBuf,

    /// Number of closest words that will be shown
    #[arg(short = 'n', long, default_value_t = 40)]
    top: usize,

    /// Set the debug mode
    #[arg(long = "debug", default_value_t = 0)]
    debug_mode: usize,
}

fn run(options: Options) -> Result<()> {
    let mut rng = RandomStream::new(options.model.seed);
    let model = Model::build(options.model, &mut rng)?;
    sink::load_model(model.store(), &options.model_file)?;

    eprintln!("Enter a word ({} to quit)", neighbors::QUIT);
    neighbors::query_loop(
        model.vocab(),
        model.store(),
        options.top,
        io::stdin().lock(),
        io::stdout().lock(),
    )
}

fn main() {
    let options = Options::parse();
    init_tracing(options.debug_mode);

    if let Err(err) = run(options) {
        eprintln!("{err:#}");
        process::exit(1);
    }
}
