//! Joint training of word vectors and paragraph vectors.
//!
//! A corpus is one document per line. Every document gets a paragraph vector
//! that, together with the `context` words preceding each position, is used to
//! predict the word at that position. Prediction is trained with negative
//! sampling, and all worker threads update the shared matrices without locks.

pub mod config;
pub mod corpus;
pub mod model;
pub mod neighbors;
pub mod rng;
pub mod sink;
pub mod store;
pub mod train;
pub mod update;
pub mod vocab;

#[allow(non_camel_case_types)]
pub type real = f64; // Precision of float numbers

pub use config::{ModelConfig, TrainConfig};
pub use model::Model;
pub use rng::RandomStream;
pub use store::{EmbeddingStore, Matrix, Real, ScoreColumn, Shape};
pub use train::{partition, Trainer};
pub use update::{UpdateRule, UpdateStats};
pub use vocab::Vocabulary;
