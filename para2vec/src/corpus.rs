//! Reading documents out of a corpus file.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use std::str::SplitWhitespace;

use anyhow::{Context, Result};

/// Split a document into words, assuming any run of whitespace to be a word
/// boundary.
pub fn split_words(line: &str) -> SplitWhitespace<'_> {
    line.split_whitespace()
}

/// Reads a corpus one document (line) at a time, keeping track of the byte
/// offset of the next document.
pub struct DocumentReader<R> {
    reader: R,
    buf: Vec<u8>,
    offset: u64,
}

impl DocumentReader<BufReader<File>> {
    /// Open `path` and position the reader at byte `offset`, which must be
    /// the start of a line.
    pub fn open(path: &Path, offset: u64) -> Result<Self> {
        let mut file = File::open(path)
            .with_context(|| format!("error opening corpus file {}", path.display()))?;
        file.seek(SeekFrom::Start(offset))
            .with_context(|| format!("error seeking within corpus file {}", path.display()))?;
        Ok(DocumentReader::new(BufReader::new(file), offset))
    }
}

impl<R: BufRead> DocumentReader<R> {
    pub fn new(reader: R, offset: u64) -> Self {
        DocumentReader {
            reader,
            buf: Vec::new(),
            offset,
        }
    }

    /// Byte offset of the next document.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Returns the next document, or `Ok(None)` at end of file.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn next_document(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        let n = self
            .reader
            .read_until(b'\n', &mut self.buf)
            .context("error reading corpus file")?;
        if n == 0 {
            return Ok(None);
        }
        self.offset += n as u64;
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_track_line_starts() {
        let text = "the cat sat\n\nthe dog ran\r\nlast";
        let mut reader = DocumentReader::new(text.as_bytes(), 0);
        let mut docs = vec![];
        let mut offsets = vec![reader.offset()];
        while let Some(doc) = reader.next_document().unwrap() {
            docs.push(split_words(&doc).map(str::to_string).collect::<Vec<_>>());
            offsets.push(reader.offset());
        }
        assert_eq!(docs.len(), 4);
        assert_eq!(docs[0], ["the", "cat", "sat"]);
        assert!(docs[1].is_empty());
        assert_eq!(docs[2], ["the", "dog", "ran"]);
        assert_eq!(docs[3], ["last"]);
        assert_eq!(offsets, [0, 12, 13, 26, 30]);
    }
}
