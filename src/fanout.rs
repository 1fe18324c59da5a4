//! Fan-out: one canonical paper into its full set of physical rows, plus
//! the batched writer that lands them in the store.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, warn};

use crate::constants::load::{DEFAULT_WRITE_CONCURRENCY, WRITE_BATCH_SIZE};
use crate::errors::IndexError;
use crate::paper::Paper;
use crate::retry::RetryPolicy;
use crate::schema::{
    SecondaryIndex, author_index_partition, author_meta_partition, category_partition,
    dated_sort_key, details_sort_key, keyword_index_partition, keyword_meta_partition,
    paper_partition,
};
use crate::table::{RecordKind, RowPayload, SecondaryKey, TableClient, TableRow};
use crate::types::{Keyword, PartitionKey, SortKey};

/// Expand one paper into its deduplicated set of physical rows.
///
/// Deterministic: every key is a pure function of paper content, so
/// re-running fan-out for the same paper produces the same natural keys
/// and the store upserts in place. Produces one paper row, one row per
/// category, one per author, and one per keyword.
pub fn expand(paper: &Paper, keywords: &[Keyword]) -> Vec<TableRow> {
    let detailed = RowPayload::detailed(paper, keywords);
    let base = RowPayload::base(paper);
    let dated: SortKey = dated_sort_key(&paper.published_date, &paper.arxiv_id);

    let mut rows = Vec::with_capacity(
        1 + paper.categories.len() + paper.authors.len() + keywords.len(),
    );
    let mut seen: HashSet<(PartitionKey, SortKey)> = HashSet::new();

    let paper_row = TableRow {
        partition_key: paper_partition(&paper.arxiv_id),
        sort_key: details_sort_key(&paper.published_date),
        kind: RecordKind::Paper,
        secondary: Some(SecondaryKey {
            index: SecondaryIndex::PaperId,
            partition_key: paper_partition(&paper.arxiv_id),
            sort_key: paper.published_date.clone(),
        }),
        payload: detailed.clone(),
    };
    seen.insert(paper_row.natural_key());
    rows.push(paper_row);

    for category in &paper.categories {
        let row = TableRow {
            partition_key: category_partition(category),
            sort_key: dated.clone(),
            kind: RecordKind::Category,
            secondary: None,
            payload: detailed.clone(),
        };
        if seen.insert(row.natural_key()) {
            rows.push(row);
        }
    }

    for author in &paper.authors {
        let row = TableRow {
            partition_key: author_meta_partition(author),
            sort_key: dated.clone(),
            kind: RecordKind::Author,
            secondary: Some(SecondaryKey {
                index: SecondaryIndex::Author,
                partition_key: author_index_partition(author),
                sort_key: dated.clone(),
            }),
            payload: base.clone(),
        };
        if seen.insert(row.natural_key()) {
            rows.push(row);
        }
    }

    for keyword in keywords {
        let row = TableRow {
            partition_key: keyword_meta_partition(keyword),
            sort_key: dated.clone(),
            kind: RecordKind::Keyword,
            secondary: Some(SecondaryKey {
                index: SecondaryIndex::Keyword,
                partition_key: keyword_index_partition(keyword),
                sort_key: dated.clone(),
            }),
            payload: base.clone(),
        };
        if seen.insert(row.natural_key()) {
            rows.push(row);
        }
    }

    rows
}

/// Batched row writer with bounded in-flight batches and explicit retry.
///
/// Unprocessed rows from a batch are retried per the [`RetryPolicy`];
/// once the budget is spent the write fails loudly with the count of
/// rows that never landed; partial success is reported, never dropped.
#[derive(Clone, Debug)]
pub struct FanoutWriter {
    batch_size: usize,
    write_concurrency: usize,
    retry: RetryPolicy,
}

impl Default for FanoutWriter {
    fn default() -> Self {
        Self {
            batch_size: WRITE_BATCH_SIZE,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

impl FanoutWriter {
    /// Rows per submitted batch (minimum 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Concurrently in-flight batches (minimum 1).
    pub fn with_write_concurrency(mut self, write_concurrency: usize) -> Self {
        self.write_concurrency = write_concurrency.max(1);
        self
    }

    /// Retry policy applied to throttled batches.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Write all rows, returning how many landed.
    pub fn write_all(
        &self,
        client: &dyn TableClient,
        rows: Vec<TableRow>,
    ) -> Result<usize, IndexError> {
        let total = rows.len();
        if total == 0 {
            return Ok(0);
        }
        let batches: Vec<Vec<TableRow>> = rows
            .chunks(self.batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let next_batch = AtomicUsize::new(0);
        let written = AtomicUsize::new(0);
        let unwritten = AtomicUsize::new(0);
        let failure: Mutex<Option<IndexError>> = Mutex::new(None);

        let workers = self.write_concurrency.min(batches.len());
        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    loop {
                        let idx = next_batch.fetch_add(1, Ordering::SeqCst);
                        let Some(batch) = batches.get(idx) else {
                            break;
                        };
                        if let Err(err) = self.write_batch(client, idx, batch, &written, &unwritten)
                        {
                            *failure.lock().expect("writer failure slot poisoned") = Some(err);
                            break;
                        }
                    }
                });
            }
        });

        if let Some(err) = failure.into_inner().expect("writer failure slot poisoned") {
            return Err(err);
        }
        let unwritten = unwritten.load(Ordering::SeqCst);
        if unwritten > 0 {
            return Err(IndexError::RetryExhausted {
                attempts: self.retry.max_attempts,
                unwritten,
                total,
            });
        }
        debug!(batches = batches.len(), rows = total, "fan-out write complete");
        Ok(written.load(Ordering::SeqCst))
    }

    /// Submit one batch, retrying unprocessed rows until accepted or the
    /// attempt budget runs out.
    fn write_batch(
        &self,
        client: &dyn TableClient,
        batch_idx: usize,
        batch: &[TableRow],
        written: &AtomicUsize,
        unwritten: &AtomicUsize,
    ) -> Result<(), IndexError> {
        let mut pending = batch.to_vec();
        let mut attempts = 0usize;
        while !pending.is_empty() {
            let submitted = pending.len();
            let outcome = client.batch_put(std::mem::take(&mut pending))?;
            attempts += 1;
            written.fetch_add(submitted - outcome.unprocessed.len(), Ordering::SeqCst);
            if outcome.unprocessed.is_empty() {
                break;
            }
            if self.retry.allows(attempts) {
                warn!(
                    batch = batch_idx,
                    rejected = outcome.unprocessed.len(),
                    attempt = attempts,
                    "store throttled batch; backing off"
                );
                thread::sleep(self.retry.delay_for(attempts - 1));
                pending = outcome.unprocessed;
            } else {
                unwritten.fetch_add(outcome.unprocessed.len(), Ordering::SeqCst);
                warn!(
                    batch = batch_idx,
                    unwritten = outcome.unprocessed.len(),
                    "retry budget exhausted for batch"
                );
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keywords::extract_keywords;
    use crate::table::MemoryTable;
    use std::time::Duration;

    fn sample_paper() -> Paper {
        Paper {
            arxiv_id: "A1".to_string(),
            title: "Robust learning".to_string(),
            authors: vec!["Ada".to_string()],
            abstract_text: "We propose a new method for robust learning robust robust"
                .to_string(),
            categories: vec!["cs.AI".to_string()],
            published: "2024-01-05T00:00:00Z".to_string(),
            published_date: "2024-01-05".to_string(),
        }
    }

    fn fast_retry(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[test]
    fn expands_one_row_per_kind_member() {
        let paper = sample_paper();
        let keywords = extract_keywords(&paper.abstract_text, 3);
        assert_eq!(keywords, vec!["robust", "new", "learning"]);

        let rows = expand(&paper, &keywords);
        // 1 paper + 1 category + 1 author + 3 keywords.
        assert_eq!(rows.len(), 6);
        assert_eq!(
            rows.iter().filter(|r| r.kind == RecordKind::Paper).count(),
            1
        );
        assert_eq!(
            rows.iter().filter(|r| r.kind == RecordKind::Keyword).count(),
            3
        );
    }

    #[test]
    fn expansion_is_deterministic_and_deduplicated() {
        let mut paper = sample_paper();
        paper.authors.push("Ada".to_string()); // duplicate slips past normalize
        let keywords = extract_keywords(&paper.abstract_text, 3);
        let first = expand(&paper, &keywords);
        let second = expand(&paper, &keywords);
        assert_eq!(first, second);
        assert_eq!(
            first.iter().filter(|r| r.kind == RecordKind::Author).count(),
            1
        );
    }

    #[test]
    fn writer_recovers_from_transient_throttling() {
        let paper = sample_paper();
        let rows = expand(&paper, &extract_keywords(&paper.abstract_text, 3));
        let table = MemoryTable::provisioned().with_capacity_faults(4);
        let writer = FanoutWriter::default()
            .with_batch_size(3)
            .with_retry(fast_retry(4));
        let written = writer.write_all(&table, rows.clone()).expect("write");
        assert_eq!(written, rows.len());
        assert_eq!(table.row_count(), rows.len());
    }

    #[test]
    fn exhausted_budget_reports_unwritten_rows() {
        let paper = sample_paper();
        let rows = expand(&paper, &extract_keywords(&paper.abstract_text, 3));
        let total = rows.len();
        // More faults than the budget can ever absorb.
        let table = MemoryTable::provisioned().with_capacity_faults(10_000);
        let writer = FanoutWriter::default()
            .with_batch_size(4)
            .with_write_concurrency(1)
            .with_retry(fast_retry(2));
        let err = writer.write_all(&table, rows).unwrap_err();
        match err {
            IndexError::RetryExhausted {
                unwritten,
                total: reported,
                ..
            } => {
                assert_eq!(unwritten, total);
                assert_eq!(reported, total);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_writes_nothing() {
        let table = MemoryTable::provisioned();
        let written = FanoutWriter::default()
            .write_all(&table, Vec::new())
            .expect("write");
        assert_eq!(written, 0);
    }
}
