//! The per-document gradient step.

use std::ops::AddAssign;

use anyhow::{ensure, Result};

use crate::real;
use crate::rng::RandomStream;
use crate::store::{accumulate, add_scaled, apply_gradient, dot, EmbeddingStore, Real, Shape};
use crate::vocab::Vocabulary;

/// The logistic function, 1 / (1 + e^-x).
pub fn sigmoid(x: real) -> real {
    1.0 / (1.0 + (-x).exp())
}

/// Counters gathered while training.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct UpdateStats {
    /// Positions that got a gradient step.
    pub trained: u64,
    /// Positions skipped because the word was unknown or subsampled away.
    pub skipped: u64,
    /// Sum of the logistic loss over all positive and negative examples.
    pub loss: real,
    /// Number of examples contributing to `loss`.
    pub examples: u64,
}

impl UpdateStats {
    pub fn mean_loss(&self) -> real {
        if self.examples == 0 {
            0.0
        } else {
            self.loss / self.examples as real
        }
    }
}

impl AddAssign for UpdateStats {
    fn add_assign(&mut self, other: UpdateStats) {
        self.trained += other.trained;
        self.skipped += other.skipped;
        self.loss += other.loss;
        self.examples += other.examples;
    }
}

/// Per-thread buffers for `UpdateRule::train_document`.
///
/// Sized for one model shape; see `fits`.
pub struct UpdateScratch {
    shape: Shape,
    /// Gradient for the paragraph vector, accumulated over one position.
    paragraph_grad: Vec<real>,
    /// Gradient for each context word vector, `context_len` blocks of `word_dim`.
    context_grad: Vec<real>,
    /// Negative samples already drawn for the current position.
    negatives: Vec<usize>,
}

impl UpdateScratch {
    pub fn new(store: &EmbeddingStore) -> Self {
        UpdateScratch {
            shape: store.shape(),
            paragraph_grad: vec![0.0; store.paragraph_dim()],
            context_grad: vec![0.0; store.context_len() * store.word_dim()],
            negatives: vec![],
        }
    }

    /// True if these buffers can be used with `store`.
    pub fn fits(&self, store: &EmbeddingStore) -> bool {
        self.shape == store.shape()
    }
}

/// Skip-gram-style negative sampling with a paragraph vector.
///
/// For each position, the paragraph vector and the `context_len` preceding
/// word vectors, each paired with its own block of the target's word-score
/// column, predict the target word (label 1) and `negative` noise words
/// (label 0).
pub struct UpdateRule<'a> {
    vocab: &'a Vocabulary,
    store: &'a EmbeddingStore,
    negative: usize,
}

impl<'a> UpdateRule<'a> {
    /// Fails unless the noise table holds enough distinct words to draw
    /// `negative` samples different from each other and from any target.
    /// Without that guarantee the rejection loop in `train_document` could
    /// spin forever.
    pub fn new(vocab: &'a Vocabulary, store: &'a EmbeddingStore, negative: usize) -> Result<Self> {
        ensure!(
            store.word_vectors().cols() == vocab.vocab_size()
                && store.paragraph_vectors().cols() == vocab.num_documents(),
            "model matrices do not match the vocabulary"
        );
        if negative > 0 {
            let pool = vocab.distinct_noise_words();
            ensure!(
                negative < pool,
                "insufficient negative-sample pool: {negative} negative samples requested, \
                 but the noise table only has {pool} distinct words"
            );
        }
        Ok(UpdateRule {
            vocab,
            store,
            negative,
        })
    }

    pub fn vocab(&self) -> &'a Vocabulary {
        self.vocab
    }

    pub fn store(&self) -> &'a EmbeddingStore {
        self.store
    }

    /// Train on one document.
    ///
    /// `document` is the document's word indexes, left-padded with
    /// `context_len` null sentinels (see `Vocabulary::encode`).
    pub fn train_document(
        &self,
        paragraph: usize,
        document: &[usize],
        alpha: real,
        rng: &mut RandomStream,
        scratch: &mut UpdateScratch,
    ) -> UpdateStats {
        let context_len = self.store.context_len();
        let word_dim = self.store.word_dim();
        let paragraph_vec = self.store.paragraph_vector(paragraph);
        let unknown = self.vocab.unknown_index();
        let mut stats = UpdateStats::default();

        for i in context_len..document.len() {
            let target = document[i];
            // One uniform draw per known position, whether or not it is discarded
            if target == unknown || self.vocab.discard_probability(target) > rng.zero2one() {
                stats.skipped += 1;
                continue;
            }
            let context = &document[i - context_len..i];

            scratch.paragraph_grad.fill(0.0);
            scratch.context_grad.fill(0.0);
            scratch.negatives.clear();

            stats.loss += self.example(target, true, paragraph_vec, context, alpha, scratch);
            for _ in 0..self.negative {
                let negative = loop {
                    let candidate = self.vocab.sample_noise(rng);
                    if candidate != target && !scratch.negatives.contains(&candidate) {
                        break candidate;
                    }
                };
                scratch.negatives.push(negative);
                stats.loss += self.example(negative, false, paragraph_vec, context, alpha, scratch);
            }
            stats.examples += 1 + self.negative as u64;

            // Learn weights input -> hidden
            apply_gradient(paragraph_vec, -alpha, &scratch.paragraph_grad);
            for (offset, &word) in context.iter().enumerate() {
                apply_gradient(
                    self.store.word_vector(word),
                    -alpha,
                    &scratch.context_grad[offset * word_dim..][..word_dim],
                );
            }
            stats.trained += 1;
        }
        stats
    }

    /// Score `word` against the paragraph and context, update its word-score
    /// column, and accumulate the input-side gradients into `scratch`.
    ///
    /// Returns the logistic loss of the example.
    fn example(
        &self,
        word: usize,
        label: bool,
        paragraph_vec: &[Real],
        context: &[usize],
        alpha: real,
        scratch: &mut UpdateScratch,
    ) -> real {
        let word_dim = self.store.word_dim();
        let column = self.store.score_column(word);

        // Propagate hidden -> output
        let mut f = dot(paragraph_vec, column.paragraph_block());
        for (offset, &c) in context.iter().enumerate() {
            f += dot(self.store.word_vector(c), column.context_block(offset));
        }
        let yh = sigmoid(f);
        let (g, p) = if label { (yh - 1.0, yh) } else { (yh, 1.0 - yh) };

        // Propagate errors output -> hidden
        accumulate(&mut scratch.paragraph_grad, g, column.paragraph_block());
        for offset in 0..context.len() {
            accumulate(
                &mut scratch.context_grad[offset * word_dim..][..word_dim],
                g,
                column.context_block(offset),
            );
        }

        // Learn weights hidden -> output
        let step = -alpha * g;
        add_scaled(column.paragraph_block(), step, paragraph_vec);
        for (offset, &c) in context.iter().enumerate() {
            add_scaled(column.context_block(offset), step, self.store.word_vector(c));
        }

        -p.max(real::MIN_POSITIVE).ln()
    }
}
