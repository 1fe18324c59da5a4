//! The load pass: parse a raw papers document, normalize each record,
//! extract keywords, fan out, and write. Per-entity failures are
//! skipped and counted rather than aborting the batch.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::keywords::DEFAULT_TOP_K;
use crate::constants::load::{DEFAULT_WORKERS, SKIP_MISSING_ID, SKIP_RECORD_MSG};
use crate::errors::IndexError;
use crate::fanout::{FanoutWriter, expand};
use crate::keywords::extract_keywords;
use crate::paper::RawPaper;
use crate::table::{RecordKind, TableClient, TableRow};
use crate::types::SkipReason;

/// Accepted document shapes: a bare array of records or an object
/// wrapping them under `papers`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PapersDocument {
    Wrapped { papers: Vec<RawPaper> },
    Bare(Vec<RawPaper>),
}

impl PapersDocument {
    fn into_records(self) -> Vec<RawPaper> {
        match self {
            PapersDocument::Wrapped { papers } => papers,
            PapersDocument::Bare(papers) => papers,
        }
    }
}

/// Outcome of one load pass.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LoadSummary {
    /// Papers that normalized successfully and were fanned out.
    pub papers_loaded: usize,
    /// Physical rows written to the store.
    pub records_written: usize,
    /// Paper detail rows produced.
    pub paper_records: usize,
    /// Category rows produced.
    pub category_records: usize,
    /// Author rows produced.
    pub author_records: usize,
    /// Keyword rows produced.
    pub keyword_records: usize,
    /// Input records skipped as invalid.
    pub skipped: usize,
    /// Skip tallies by reason class.
    pub skip_reasons: IndexMap<SkipReason, usize>,
    /// Papers whose publication date fell back to today.
    pub published_defaulted: usize,
}

impl LoadSummary {
    /// Physical rows per logical paper (write amplification).
    pub fn denormalization_factor(&self) -> f64 {
        if self.papers_loaded == 0 {
            0.0
        } else {
            self.records_written as f64 / self.papers_loaded as f64
        }
    }
}

/// One-pass loader: normalize → extract keywords → fan out → batch write.
///
/// Per-entity processing is independent and parallelized across a bounded
/// worker pool; shared state is limited to counters and the collected row
/// buffer. Loads are idempotent: rerunning one repairs any partially
/// written paper from a failed earlier run.
#[derive(Clone, Debug)]
pub struct Loader {
    top_k: usize,
    workers: usize,
    writer: FanoutWriter,
}

impl Default for Loader {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            workers: DEFAULT_WORKERS,
            writer: FanoutWriter::default(),
        }
    }
}

impl Loader {
    /// Keywords kept per abstract.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Entity-processing workers (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Writer used for the physical batches.
    pub fn with_writer(mut self, writer: FanoutWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Load a papers document from `path` into the store behind `client`.
    pub fn load_path(
        &self,
        path: impl AsRef<Path>,
        client: &dyn TableClient,
    ) -> Result<LoadSummary, IndexError> {
        let file = File::open(path.as_ref())?;
        let document: PapersDocument = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| IndexError::Parse(err.to_string()))?;
        self.load_records(document.into_records(), client)
    }

    /// Load already-parsed raw records into the store behind `client`.
    pub fn load_records(
        &self,
        raw: Vec<RawPaper>,
        client: &dyn TableClient,
    ) -> Result<LoadSummary, IndexError> {
        let papers_loaded = AtomicUsize::new(0);
        let skipped = AtomicUsize::new(0);
        let published_defaulted = AtomicUsize::new(0);
        let skip_reasons: Mutex<IndexMap<SkipReason, usize>> = Mutex::new(IndexMap::new());
        let collected: Mutex<Vec<TableRow>> = Mutex::new(Vec::new());

        if !raw.is_empty() {
            let chunk_len = raw.len().div_ceil(self.workers.min(raw.len()));
            let papers_loaded = &papers_loaded;
            let skipped = &skipped;
            let published_defaulted = &published_defaulted;
            let skip_reasons = &skip_reasons;
            let collected = &collected;
            thread::scope(|scope| {
                for chunk in raw.chunks(chunk_len) {
                    scope.spawn(move || {
                        let mut rows = Vec::new();
                        for record in chunk {
                            match record.clone().normalize() {
                                Err(err) => {
                                    warn!(error = %err, SKIP_RECORD_MSG);
                                    skipped.fetch_add(1, Ordering::SeqCst);
                                    *skip_reasons
                                        .lock()
                                        .expect("skip reason tally poisoned")
                                        .entry(SKIP_MISSING_ID.to_string())
                                        .or_insert(0) += 1;
                                }
                                Ok(normalized) => {
                                    if normalized.published_defaulted {
                                        published_defaulted.fetch_add(1, Ordering::SeqCst);
                                    }
                                    let keywords = extract_keywords(
                                        &normalized.paper.abstract_text,
                                        self.top_k,
                                    );
                                    rows.extend(expand(&normalized.paper, &keywords));
                                    papers_loaded.fetch_add(1, Ordering::SeqCst);
                                }
                            }
                        }
                        collected
                            .lock()
                            .expect("row buffer poisoned")
                            .append(&mut rows);
                    });
                }
            });
        }

        let rows = collected.into_inner().expect("row buffer poisoned");
        let mut summary = LoadSummary {
            papers_loaded: papers_loaded.into_inner(),
            skipped: skipped.into_inner(),
            published_defaulted: published_defaulted.into_inner(),
            skip_reasons: skip_reasons.into_inner().expect("skip reason tally poisoned"),
            ..LoadSummary::default()
        };
        for row in &rows {
            match row.kind {
                RecordKind::Paper => summary.paper_records += 1,
                RecordKind::Category => summary.category_records += 1,
                RecordKind::Author => summary.author_records += 1,
                RecordKind::Keyword => summary.keyword_records += 1,
            }
        }

        summary.records_written = self.writer.write_all(client, rows)?;
        info!(
            papers = summary.papers_loaded,
            records = summary.records_written,
            skipped = summary.skipped,
            category_records = summary.category_records,
            author_records = summary.author_records,
            keyword_records = summary.keyword_records,
            denormalization_factor = summary.denormalization_factor(),
            "load complete"
        );
        Ok(summary)
    }
}
