//! Multi-threaded training over a corpus.

use std::ops::Range;
use std::path::Path;
use std::thread;
use std::time::Instant;

use anyhow::{ensure, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::corpus::DocumentReader;
use crate::model::Model;
use crate::real;
use crate::rng::RandomStream;
use crate::update::{UpdateRule, UpdateScratch, UpdateStats};

/// Split documents `0..num_documents` into `num_workers` contiguous ranges.
///
/// All ranges but the last have `num_documents / num_workers` documents;
/// the last one also takes the remainder.
pub fn partition(num_documents: usize, num_workers: usize) -> Vec<Range<usize>> {
    assert!(num_workers > 0, "need at least one worker");
    let step = num_documents / num_workers;
    (0..num_workers)
        .map(|i| {
            let start = i * step;
            let end = if i == num_workers - 1 {
                num_documents
            } else {
                start + step
            };
            start..end
        })
        .collect()
}

struct Worker {
    id: usize,
    documents: Range<usize>,
    rng: RandomStream,
    alpha: real,
    /// Amount subtracted from `alpha` after each document.
    shrink: real,
    scratch: UpdateScratch,
    document: Vec<usize>,
}

impl Worker {
    fn train_partition(
        &mut self,
        corpus: &Path,
        rule: &UpdateRule<'_>,
        progress: &ProgressBar,
    ) -> Result<UpdateStats> {
        let mut stats = UpdateStats::default();
        if self.documents.is_empty() {
            return Ok(stats);
        }
        let vocab = rule.vocab();
        let context_len = rule.store().context_len();
        let mut reader = DocumentReader::open(corpus, vocab.document_offset(self.documents.start))?;

        for paragraph in self.documents.clone() {
            let Some(line) = reader
                .next_document()
                .with_context(|| format!("error reading document {paragraph}"))?
            else {
                warn!(
                    worker = self.id,
                    paragraph, "corpus ended before the end of this worker's documents"
                );
                break;
            };
            vocab.encode(&line, context_len, &mut self.document);
            stats += rule.train_document(
                paragraph,
                &self.document,
                self.alpha,
                &mut self.rng,
                &mut self.scratch,
            );
            self.alpha -= self.shrink;
            progress.inc(1);
        }
        Ok(stats)
    }
}

/// Runs training passes with a fixed number of worker threads.
///
/// Worker state (its random stream and buffers) is created on the first call
/// to `train` and kept for later calls; only the document ranges and the
/// learning rate are reset each time. Buffers are reallocated if a later call
/// passes a model of a different shape. Threads are spawned and joined once
/// per call.
pub struct Trainer {
    num_threads: usize,
    /// Seeds each worker's random stream.
    master: RandomStream,
    workers: Vec<Worker>,
    show_progress: bool,
}

impl Trainer {
    pub fn new(num_threads: usize, master: RandomStream) -> Result<Self> {
        ensure!(num_threads > 0, "need at least one training thread");
        Ok(Trainer {
            num_threads,
            master,
            workers: vec![],
            show_progress: false,
        })
    }

    /// Draw a progress bar on stderr during `train`.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// One pass over the corpus.
    ///
    /// Every worker starts at `alpha` and lowers its rate linearly by a total
    /// of `shrink` over its own documents. All workers update `model`
    /// concurrently, without locking.
    pub fn train(
        &mut self,
        model: &Model,
        alpha: real,
        shrink: real,
        negative: usize,
    ) -> Result<UpdateStats> {
        let rule = UpdateRule::new(model.vocab(), model.store(), negative)?;
        let num_documents = model.vocab().num_documents();

        if self.workers.is_empty() {
            for id in 0..self.num_threads {
                self.workers.push(Worker {
                    id,
                    documents: 0..0,
                    rng: self.master.split(),
                    alpha,
                    shrink: 0.0,
                    scratch: UpdateScratch::new(model.store()),
                    document: vec![],
                });
            }
        }
        for (worker, documents) in self
            .workers
            .iter_mut()
            .zip(partition(num_documents, self.num_threads))
        {
            if !worker.scratch.fits(model.store()) {
                worker.scratch = UpdateScratch::new(model.store());
            }
            worker.alpha = alpha;
            worker.shrink = if documents.is_empty() {
                0.0
            } else {
                shrink / documents.len() as real
            };
            worker.documents = documents;
        }

        let progress = self.progress_bar(num_documents as u64)?;
        let corpus = model.config().train_file.as_path();
        let start = Instant::now();
        let results = thread::scope(|s| {
            let rule = &rule;
            let threads = self
                .workers
                .iter_mut()
                .map(|worker| {
                    let progress = progress.clone();
                    s.spawn(move || worker.train_partition(corpus, rule, &progress))
                })
                .collect::<Vec<_>>();
            threads
                .into_iter()
                .map(|thread| thread.join())
                .collect::<Vec<_>>()
        });
        progress.finish_and_clear();

        let mut stats = UpdateStats::default();
        for (id, result) in results.into_iter().enumerate() {
            match result {
                Ok(result) => {
                    stats += result.with_context(|| format!("error in worker thread {id}"))?
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        debug!(
            trained = stats.trained,
            skipped = stats.skipped,
            loss = stats.mean_loss(),
            seconds = start.elapsed().as_secs_f64(),
            "finished training pass"
        );
        Ok(stats)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let bar = ProgressBar::new(len);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} documents",
            )
            .context("invalid progress bar template")?,
        );
        Ok(bar)
    }
}
