//! Writing trained vectors out, and saving and restoring the matrices.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::real;
use crate::store::{EmbeddingStore, Matrix, Real};
use crate::vocab::Vocabulary;

/// On-disk form of one matrix: its dimensions, then its values row by row.
#[derive(Serialize, Deserialize)]
struct MatrixRecord {
    rows: u64,
    cols: u64,
    values: Vec<real>,
}

fn write_vector<W: Write>(out: &mut W, vector: &[Real]) -> std::io::Result<()> {
    for v in vector {
        write!(out, " {}", v.get())?;
    }
    writeln!(out)
}

/// Write one line per document: the document's index, then its vector.
pub fn write_paragraph_vectors<W: Write>(store: &EmbeddingStore, out: &mut W) -> Result<()> {
    for paragraph in 0..store.paragraph_vectors().cols() {
        write!(out, "{paragraph}").context("error writing paragraph vectors")?;
        write_vector(out, store.paragraph_vector(paragraph))
            .context("error writing paragraph vectors")?;
    }
    Ok(())
}

/// Write one line per real word: the word, then its vector. The unknown and
/// null sentinels are left out.
pub fn write_word_vectors<W: Write>(
    vocab: &Vocabulary,
    store: &EmbeddingStore,
    out: &mut W,
) -> Result<()> {
    for word in 0..vocab.num_words() {
        write!(out, "{}", vocab.word(word)).context("error writing word vectors")?;
        write_vector(out, store.word_vector(word)).context("error writing word vectors")?;
    }
    Ok(())
}

pub fn save_paragraph_vectors(store: &EmbeddingStore, path: &Path) -> Result<()> {
    let mut fo = create(path)?;
    write_paragraph_vectors(store, &mut fo)?;
    fo.flush().context("error writing output file")
}

pub fn save_word_vectors(vocab: &Vocabulary, store: &EmbeddingStore, path: &Path) -> Result<()> {
    let mut fo = create(path)?;
    write_word_vectors(vocab, store, &mut fo)?;
    fo.flush().context("error writing output file")
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .with_context(|| format!("error creating output file {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Serialize the word, paragraph and word-score matrices, in that order.
pub fn write_model<W: Write>(store: &EmbeddingStore, mut out: W) -> Result<()> {
    for (name, matrix) in store.matrices() {
        let record = MatrixRecord {
            rows: matrix.rows() as u64,
            cols: matrix.cols() as u64,
            values: matrix.to_row_major(),
        };
        bincode::serialize_into(&mut out, &record)
            .with_context(|| format!("error writing {name} matrix"))?;
    }
    Ok(())
}

/// Overwrite the matrices of `store` with ones written by `write_model`.
///
/// Every matrix must have exactly the dimensions it has in `store`.
pub fn read_model<R: Read>(store: &EmbeddingStore, mut input: R) -> Result<()> {
    for (name, matrix) in store.matrices() {
        let record: MatrixRecord = bincode::deserialize_from(&mut input)
            .with_context(|| format!("error reading {name} matrix"))?;
        check_dimensions(name, matrix, &record)?;
        matrix.assign_row_major(&record.values)?;
    }
    Ok(())
}

fn check_dimensions(name: &str, matrix: &Matrix, record: &MatrixRecord) -> Result<()> {
    ensure!(
        record.rows == matrix.rows() as u64 && record.cols == matrix.cols() as u64,
        "{name} matrix is {}x{}, but this model needs {}x{}",
        record.rows,
        record.cols,
        matrix.rows(),
        matrix.cols()
    );
    Ok(())
}

pub fn save_model(store: &EmbeddingStore, path: &Path) -> Result<()> {
    let mut fo = create(path)?;
    write_model(store, &mut fo)
        .with_context(|| format!("failed to save model to file {}", path.display()))?;
    fo.flush().context("error writing model file")
}

pub fn load_model(store: &EmbeddingStore, path: &Path) -> Result<()> {
    let f = BufReader::new(
        File::open(path).with_context(|| format!("failed to open model file {}", path.display()))?,
    );
    read_model(store, f).with_context(|| format!("failed to load model from file {}", path.display()))
}
