//! Nearest-neighbor queries over trained word vectors.

use std::cmp::Reverse;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;

use crate::real;
use crate::store::{dot, EmbeddingStore, Real};
use crate::vocab::Vocabulary;

/// Typing this ends `query_loop`.
pub const QUIT: &str = "q";

/// Score given to the query word itself, so it always ranks last.
const SELF_SIMILARITY: real = -1.0e5;

pub fn norm(v: &[Real]) -> real {
    dot(v, v).sqrt()
}

/// Cosine similarity. Zero vectors are similar to nothing.
pub fn cosine_similarity(a: &[Real], b: &[Real]) -> real {
    let len = norm(a) * norm(b);
    if len == 0.0 {
        0.0
    } else {
        dot(a, b) / len
    }
}

/// The `n` real words most similar to `target`, best first.
///
/// `target` itself is never included.
pub fn nearest_words(
    vocab: &Vocabulary,
    store: &EmbeddingStore,
    target: usize,
    n: usize,
) -> Vec<(usize, real)> {
    let v = store.word_vector(target);
    let mut best: Vec<(usize, real)> = (0..vocab.num_words())
        .map(|c| {
            let similarity = if c == target {
                SELF_SIMILARITY
            } else {
                cosine_similarity(v, store.word_vector(c))
            };
            (c, similarity)
        })
        .collect();
    best.sort_by_key(|&(_word, similarity)| Reverse(OrderedFloat(similarity)));
    best.retain(|&(word, _)| word != target);
    best.truncate(n);
    best
}

/// Read one word per line from `input` until `QUIT` or end of input, and
/// print the `n` nearest neighbors of each. Leading and trailing whitespace
/// is trimmed from each line before it is compared with `QUIT` or looked up,
/// so `"a\r"` and `" q "` mean `a` and `q`. Words missing from the vocabulary
/// are ignored.
pub fn query_loop<R: BufRead, W: Write>(
    vocab: &Vocabulary,
    store: &EmbeddingStore,
    n: usize,
    input: R,
    mut out: W,
) -> Result<()> {
    writeln!(out, "KNN words of words").context("error writing output")?;
    out.flush().context("error writing output")?;
    for line in input.lines() {
        let line = line.context("error reading query")?;
        let word = line.trim();
        if word == QUIT {
            break;
        }
        let Some(target) = vocab.lookup(word) else {
            continue;
        };
        for (c, similarity) in nearest_words(vocab, store, target, n) {
            writeln!(out, "({similarity:.5}) {}", vocab.word(c)).context("error writing output")?;
        }
        writeln!(out).context("error writing output")?;
        out.flush().context("error writing output")?;
    }
    Ok(())
}
