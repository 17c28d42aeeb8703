//! Corpus statistics: the vocabulary, subsampling and the noise table.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use crate::corpus::{split_words, DocumentReader};
use crate::real;
use crate::rng::RandomStream;

/// Label of the sentinel standing for words missing from the vocabulary.
pub const UNKNOWN_WORD: &str = "**UNK**";

/// Label of the sentinel used to pad the start of every document.
pub const NULL_WORD: &str = "**NULL**";

/// Exponent applied to word counts when building the noise table.
const NOISE_POWER: f64 = 0.75;

#[derive(Debug, Clone)]
pub struct VocabWord {
    pub word: String,
    pub count: u64,
}

/// The frozen vocabulary of a corpus.
///
/// Real words occupy indexes `0..num_words()` in the order they first appear
/// in the corpus. The unknown sentinel and the null sentinel follow, so
/// `vocab_size() == num_words() + 2`.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    words: Vec<VocabWord>,
    vocab_hash: HashMap<String, usize>,
    /// Per real word, the probability of skipping one of its occurrences.
    discard_prob: Vec<real>,
    /// Each real word's index repeated `round(count^0.75)` times.
    noise: Vec<usize>,
    /// All tokens in the corpus, including those folded into the unknown word.
    total_count: u64,
    unknown_count: u64,
    /// Byte offset of the start of each document.
    document_offsets: Vec<u64>,
}

/// Probability of discarding an occurrence of a word with normalized
/// frequency `frequency`: `max(0, 1 - sqrt(sample / frequency))`.
///
/// A `sample` of zero disables subsampling.
pub fn discard_probability(frequency: real, sample: real) -> real {
    if sample <= 0.0 || frequency <= 0.0 {
        return 0.0;
    }
    (1.0 - (sample / frequency).sqrt()).max(0.0)
}

/// Number of times a word with `count` occurrences appears in the noise table.
pub fn noise_copies(count: u64) -> usize {
    (count as f64).powf(NOISE_POWER).round() as usize
}

impl Vocabulary {
    /// Scan the corpus at `path` once and build its statistics.
    pub fn from_corpus(path: &Path, min_count: u64, sample: real) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("error opening training data file {}", path.display()))?;
        Self::from_reader(BufReader::new(file), min_count, sample)
            .with_context(|| format!("error reading training data file {}", path.display()))
    }

    /// Build statistics from a corpus already open for reading.
    pub fn from_reader<R: BufRead>(reader: R, min_count: u64, sample: real) -> Result<Self> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut counted: Vec<VocabWord> = vec![];
        let mut document_offsets = vec![];

        let mut reader = DocumentReader::new(reader, 0);
        loop {
            let offset = reader.offset();
            let Some(line) = reader.next_document()? else {
                break;
            };
            document_offsets.push(offset);
            for token in split_words(&line) {
                if let Some(&a) = seen.get(token) {
                    counted[a].count += 1;
                } else {
                    seen.insert(token.to_string(), counted.len());
                    counted.push(VocabWord {
                        word: token.to_string(),
                        count: 1,
                    });
                }
            }
        }
        drop(seen);

        // Words occurring less than min_count times are folded into the unknown word
        let mut words = Vec::with_capacity(counted.len());
        let mut vocab_hash = HashMap::with_capacity(counted.len());
        let mut noise = vec![];
        let mut unknown_count = 0;
        for vw in counted {
            if vw.count < min_count {
                unknown_count += vw.count;
                continue;
            }
            let index = words.len();
            noise.extend(std::iter::repeat(index).take(noise_copies(vw.count)));
            vocab_hash.insert(vw.word.clone(), index);
            words.push(vw);
        }

        let total_count = words.iter().map(|vw| vw.count).sum::<u64>() + unknown_count;
        let discard_prob = words
            .iter()
            .map(|vw| discard_probability(vw.count as real / total_count as real, sample))
            .collect();

        debug!(
            tokens = total_count,
            unknown_tokens = unknown_count,
            noise_table = noise.len(),
            "counted corpus"
        );

        Ok(Vocabulary {
            words,
            vocab_hash,
            discard_prob,
            noise,
            total_count,
            unknown_count,
            document_offsets,
        })
    }

    /// Vocabulary size, including the two sentinels.
    pub fn vocab_size(&self) -> usize {
        self.words.len() + 2
    }

    /// Number of real (non-sentinel) words.
    pub fn num_words(&self) -> usize {
        self.words.len()
    }

    pub fn unknown_index(&self) -> usize {
        self.words.len()
    }

    pub fn null_index(&self) -> usize {
        self.words.len() + 1
    }

    pub fn num_documents(&self) -> usize {
        self.document_offsets.len()
    }

    /// Byte offset of document `paragraph` within the corpus file.
    pub fn document_offset(&self, paragraph: usize) -> u64 {
        self.document_offsets[paragraph]
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn unknown_count(&self) -> u64 {
        self.unknown_count
    }

    /// Returns position of a word in the vocabulary; if the word is not found, returns None.
    pub fn lookup(&self, word: &str) -> Option<usize> {
        self.vocab_hash.get(word).copied()
    }

    /// Like `lookup`, but maps missing words to the unknown sentinel.
    pub fn index_of(&self, word: &str) -> usize {
        self.lookup(word).unwrap_or_else(|| self.unknown_index())
    }

    /// Get the word for an index. Sentinels get their placeholder labels.
    pub fn word(&self, index: usize) -> &str {
        match index.checked_sub(self.words.len()) {
            None => &self.words[index].word,
            Some(0) => UNKNOWN_WORD,
            Some(1) => NULL_WORD,
            Some(_) => panic!("word index {index} out of range"),
        }
    }

    /// Number of occurrences of a real word.
    pub fn count(&self, index: usize) -> u64 {
        self.words[index].count
    }

    pub fn words(&self) -> &[VocabWord] {
        &self.words
    }

    /// Subsampling probability of a real word. Panics for sentinels.
    pub fn discard_probability(&self, index: usize) -> real {
        self.discard_prob[index]
    }

    pub fn noise_table(&self) -> &[usize] {
        &self.noise
    }

    /// Number of different words a negative sample can be drawn from.
    pub fn distinct_noise_words(&self) -> usize {
        self.words.iter().filter(|vw| noise_copies(vw.count) > 0).count()
    }

    /// Draw one word from the noise distribution. Panics if the table is empty.
    pub fn sample_noise(&self, rng: &mut RandomStream) -> usize {
        self.noise[rng.below(self.noise.len())]
    }

    /// Convert a document to word indexes, left-padded with `context_len`
    /// null sentinels.
    pub fn encode(&self, line: &str, context_len: usize, document: &mut Vec<usize>) {
        document.clear();
        document.extend(std::iter::repeat(self.null_index()).take(context_len));
        document.extend(split_words(line).map(|token| self.index_of(token)));
    }

    /// Write `word count` lines for every real word.
    pub fn save(&self, vocab_file: &Path) -> Result<()> {
        let mut fo = BufWriter::new(
            File::create(vocab_file).context("error creating vocab file for write")?,
        );
        for vw in &self.words {
            writeln!(fo, "{} {}", vw.word, vw.count).context("error writing vocab file")?;
        }
        fo.flush().context("error writing vocab file")?;
        Ok(())
    }
}
