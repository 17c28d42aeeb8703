//! The three weight matrices trained by the model.
//!
//! All worker threads update these matrices at the same time without taking
//! any lock ("Hogwild" SGD). Every cell is a `Real`, an `f64` stored in an
//! atomic with relaxed ordering: a concurrent read-modify-write may lose an
//! update, but a value is never torn. Updates are sparse, so lost updates are
//! rare and training tolerates them as noise.

use std::sync::atomic::{AtomicU64, Ordering};

use aligned_box::AlignedBox;
use anyhow::{anyhow, ensure, Result};

use crate::real;
use crate::rng::RandomStream;

const ALIGNMENT: usize = 128;

#[derive(Default)]
#[repr(transparent)]
pub struct Real {
    bits: AtomicU64,
}

impl Real {
    pub fn get(&self) -> real {
        real::from_bits(self.bits.load(Ordering::Relaxed))
    }

    pub fn set(&self, value: real) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn add(&self, x: real) {
        let a = self.get();
        self.set(a + x);
    }
}

pub fn dot(a: &[Real], b: &[Real]) -> real {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(a, b)| a.get() * b.get()).sum()
}

/// `dst += scale * src`
pub fn add_scaled(dst: &[Real], scale: real, src: &[Real]) {
    assert_eq!(dst.len(), src.len());
    for (d, s) in dst.iter().zip(src.iter()) {
        d.add(scale * s.get());
    }
}

/// `acc += scale * src`, into a thread-local buffer.
pub fn accumulate(acc: &mut [real], scale: real, src: &[Real]) {
    assert_eq!(acc.len(), src.len());
    for (a, s) in acc.iter_mut().zip(src.iter()) {
        *a += scale * s.get();
    }
}

/// `dst += scale * grad`, where `grad` was built up with `accumulate`.
pub fn apply_gradient(dst: &[Real], scale: real, grad: &[real]) {
    assert_eq!(dst.len(), grad.len());
    for (d, &g) in dst.iter().zip(grad.iter()) {
        d.add(scale * g);
    }
}

/// A dense matrix stored column by column.
///
/// `cells[c * rows..(c+1) * rows]` is column `c`.
pub struct Matrix {
    rows: usize,
    cols: usize,
    cells: AlignedBox<[Real]>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or_else(|| anyhow!("matrix size {rows}x{cols} overflows"))?;
        // Zero-sized allocations are rejected, so an empty matrix still holds one cell.
        let cells = AlignedBox::slice_from_default(ALIGNMENT, len.max(1))
            .map_err(|err| anyhow!("failed to allocate a {rows}x{cols} matrix: {err:?}"))?;
        Ok(Matrix { rows, cols, cells })
    }

    /// A matrix with entries drawn uniformly from `[-1, 1) * sqrt(6 / (2 * rows + 1))`.
    pub fn random(rows: usize, cols: usize, rng: &mut RandomStream) -> Result<Self> {
        let m = Matrix::zeros(rows, cols)?;
        let scale = (6.0 / (rows as real * 2.0 + 1.0)).sqrt();
        for cell in m.cells() {
            cell.set(rng.uniform(-1.0, 1.0) * scale);
        }
        Ok(m)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    fn cells(&self) -> &[Real] {
        &self.cells[..self.rows * self.cols]
    }

    /// Column `c`. Panics if `c` is out of range.
    pub fn col(&self, c: usize) -> &[Real] {
        assert!(c < self.cols, "column {c} out of range (width {})", self.cols);
        &self.cells[c * self.rows..][..self.rows]
    }

    pub fn get(&self, r: usize, c: usize) -> real {
        self.col(c)[r].get()
    }

    pub fn set(&self, r: usize, c: usize, value: real) {
        self.col(c)[r].set(value)
    }

    /// Copy out all values, row by row.
    pub fn to_row_major(&self) -> Vec<real> {
        let mut out = Vec::with_capacity(self.rows * self.cols);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.push(self.get(r, c));
            }
        }
        out
    }

    /// Overwrite all values from a row-by-row buffer.
    pub fn assign_row_major(&self, values: &[real]) -> Result<()> {
        ensure!(
            values.len() == self.rows * self.cols,
            "expected {} values for a {}x{} matrix, got {}",
            self.rows * self.cols,
            self.rows,
            self.cols,
            values.len()
        );
        for (i, &v) in values.iter().enumerate() {
            self.set(i / self.cols, i % self.cols, v);
        }
        Ok(())
    }
}

/// Dimensions of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    /// Height of a word vector (`D_w`).
    pub word_dim: usize,
    /// Height of a paragraph vector (`D_p`).
    pub paragraph_dim: usize,
    /// Number of preceding words used to predict each word.
    pub context_len: usize,
}

impl Shape {
    /// Height of a word-score vector: one paragraph block followed by one
    /// block per context position.
    pub fn score_dim(&self) -> usize {
        self.paragraph_dim + self.context_len * self.word_dim
    }
}

/// A view of one word's output weights, split into blocks.
#[derive(Clone, Copy)]
pub struct ScoreColumn<'a> {
    cells: &'a [Real],
    shape: Shape,
}

impl<'a> ScoreColumn<'a> {
    /// Weights paired with the paragraph vector.
    pub fn paragraph_block(&self) -> &'a [Real] {
        &self.cells[..self.shape.paragraph_dim]
    }

    /// Weights paired with the word at context position `offset`, where
    /// offset 0 is the word furthest from the predicted one.
    pub fn context_block(&self, offset: usize) -> &'a [Real] {
        assert!(
            offset < self.shape.context_len,
            "context offset {offset} out of range (context length {})",
            self.shape.context_len
        );
        let word_dim = self.shape.word_dim;
        &self.cells[self.shape.paragraph_dim + offset * word_dim..][..word_dim]
    }
}

/// Word vectors, paragraph vectors and word-score vectors.
pub struct EmbeddingStore {
    shape: Shape,
    /// The learned word-vectors, one column per vocabulary entry.
    words: Matrix,
    /// The learned paragraph vectors, one column per document.
    paragraphs: Matrix,
    /// Output weights, one column per vocabulary entry.
    scores: Matrix,
}

impl EmbeddingStore {
    /// Allocate the matrices. Word and paragraph vectors start random;
    /// word-score vectors start at zero.
    pub fn new(
        shape: Shape,
        vocab_size: usize,
        num_documents: usize,
        rng: &mut RandomStream,
    ) -> Result<Self> {
        ensure!(shape.word_dim > 0, "word vector size must be positive");
        ensure!(shape.paragraph_dim > 0, "paragraph vector size must be positive");
        Ok(EmbeddingStore {
            shape,
            words: Matrix::random(shape.word_dim, vocab_size, rng)?,
            paragraphs: Matrix::random(shape.paragraph_dim, num_documents, rng)?,
            scores: Matrix::zeros(shape.score_dim(), vocab_size)?,
        })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn word_dim(&self) -> usize {
        self.shape.word_dim
    }

    pub fn paragraph_dim(&self) -> usize {
        self.shape.paragraph_dim
    }

    pub fn context_len(&self) -> usize {
        self.shape.context_len
    }

    pub fn word_vector(&self, word: usize) -> &[Real] {
        self.words.col(word)
    }

    pub fn paragraph_vector(&self, paragraph: usize) -> &[Real] {
        self.paragraphs.col(paragraph)
    }

    pub fn score_column(&self, word: usize) -> ScoreColumn<'_> {
        ScoreColumn {
            cells: self.scores.col(word),
            shape: self.shape,
        }
    }

    pub fn word_vectors(&self) -> &Matrix {
        &self.words
    }

    pub fn paragraph_vectors(&self) -> &Matrix {
        &self.paragraphs
    }

    pub fn score_vectors(&self) -> &Matrix {
        &self.scores
    }

    /// The matrices in persistence order.
    pub fn matrices(&self) -> [(&'static str, &Matrix); 3] {
        [
            ("word", &self.words),
            ("paragraph", &self.paragraphs),
            ("word-score", &self.scores),
        ]
    }
}
