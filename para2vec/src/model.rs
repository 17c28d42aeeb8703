use anyhow::{Context, Result};
use tracing::info;

use crate::config::ModelConfig;
use crate::rng::RandomStream;
use crate::store::EmbeddingStore;
use crate::vocab::Vocabulary;

/// A vocabulary together with the matrices trained over it.
pub struct Model {
    config: ModelConfig,
    vocab: Vocabulary,
    store: EmbeddingStore,
}

impl Model {
    /// Scan the corpus named by `config` and allocate freshly initialized
    /// matrices for it.
    pub fn build(config: ModelConfig, rng: &mut RandomStream) -> Result<Self> {
        config.validate()?;
        let vocab = Vocabulary::from_corpus(&config.train_file, config.min_count, config.sample)?;
        let store = EmbeddingStore::new(
            config.shape(),
            vocab.vocab_size(),
            vocab.num_documents(),
            rng,
        )
        .context("error allocating model")?;

        info!("Documents: {}", vocab.num_documents());
        info!("Vocabulary size: {}", vocab.vocab_size());
        info!("Word embedding size: {}", config.word_dim);
        info!("Paragraph embedding size: {}", config.paragraph_dim);
        info!("Context size: {}", config.context_len);

        Ok(Model {
            config,
            vocab,
            store,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn store(&self) -> &EmbeddingStore {
        &self.store
    }
}
